/// Scale factor that fits a `src_w`x`src_h` image inside `canvas_w`x`canvas_h`.
#[must_use]
pub fn fit_scale(canvas_w: u32, canvas_h: u32, src_w: u32, src_h: u32) -> f64 {
    let iw = f64::from(src_w.max(1));
    let ih = f64::from(src_h.max(1));
    let cw = f64::from(canvas_w.max(1));
    let ch = f64::from(canvas_h.max(1));
    let scale = (cw / iw).min(ch / ih);
    if scale.is_finite() && scale > 0.0 { scale } else { 1.0 }
}

/// Aspect-preserving size that fits within the canvas, rounded to whole pixels.
#[must_use]
pub fn resize_to_contain(canvas_w: u32, canvas_h: u32, src_w: u32, src_h: u32) -> (u32, u32) {
    let scale = fit_scale(canvas_w, canvas_h, src_w, src_h);
    let w = (f64::from(src_w.max(1)) * scale).round().clamp(1.0, f64::from(canvas_w.max(1)));
    let h = (f64::from(src_h.max(1)) * scale).round().clamp(1.0, f64::from(canvas_h.max(1)));
    (w as u32, h as u32)
}
