use reel::catalog::{Catalog, ScanOptions};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"x").unwrap();
}

fn names(catalog: &Catalog) -> Vec<String> {
    catalog
        .as_slice()
        .iter()
        .map(|p| p.file_name())
        .collect()
}

#[test]
fn flat_scan_lists_sorted_images_only() {
    let tmp = tempdir().unwrap();
    let lib = tmp.path();
    touch(&lib.join("b.JPG"));
    touch(&lib.join("a.png"));
    touch(&lib.join("notes.txt"));
    touch(&lib.join("nested").join("c.gif"));

    let build = Catalog::build(&ScanOptions::new(vec![lib.to_path_buf()]));
    assert_eq!(names(&build.catalog), ["a.png", "b.JPG"]);
    assert_eq!(build.anchor, 0);
    assert_eq!(build.skipped, 0);
}

#[test]
fn recursive_scan_groups_by_directory() {
    let tmp = tempdir().unwrap();
    let lib = tmp.path();
    touch(&lib.join("a").join("2.png"));
    touch(&lib.join("a").join("1.png"));
    touch(&lib.join("b").join("1.png"));
    touch(&lib.join("top.png"));

    let opts = ScanOptions::new(vec![lib.to_path_buf()]).recursive(true);
    let catalog = Catalog::build(&opts).catalog;
    let rel: Vec<String> = catalog
        .as_slice()
        .iter()
        .map(|p| {
            p.as_path()
                .strip_prefix(lib.canonicalize().unwrap())
                .unwrap()
                .display()
                .to_string()
        })
        .collect();
    assert_eq!(rel, ["a/1.png", "a/2.png", "b/1.png", "top.png"]);
}

#[test]
fn regex_filter_is_case_insensitive() {
    let tmp = tempdir().unwrap();
    let lib = tmp.path();
    touch(&lib.join("Holiday-1.png"));
    touch(&lib.join("work.png"));

    let opts = ScanOptions::new(vec![lib.to_path_buf()])
        .with_pattern("holiday")
        .unwrap();
    assert_eq!(names(&Catalog::build(&opts).catalog), ["Holiday-1.png"]);
}

#[test]
fn bad_pattern_is_rejected() {
    let err = ScanOptions::new(vec![]).with_pattern("(unclosed").unwrap_err();
    assert!(matches!(err, reel::Error::InvalidPattern(_)));
}

#[test]
fn file_root_anchors_and_lists_siblings() {
    let tmp = tempdir().unwrap();
    let lib = tmp.path();
    touch(&lib.join("a.png"));
    touch(&lib.join("b.png"));
    touch(&lib.join("c.png"));

    let build = Catalog::build(&ScanOptions::new(vec![lib.join("b.png")]));
    assert_eq!(build.catalog.len(), 3);
    assert_eq!(build.anchor, 1);
}

#[test]
fn duplicate_roots_are_collapsed() {
    let tmp = tempdir().unwrap();
    let lib = tmp.path();
    touch(&lib.join("a.png"));
    touch(&lib.join("b.png"));

    let opts = ScanOptions::new(vec![lib.to_path_buf(), lib.join("a.png"), lib.join(".")]);
    let build = Catalog::build(&opts);
    assert_eq!(names(&build.catalog), ["a.png", "b.png"]);
    assert_eq!(build.anchor, 0);
}

#[test]
fn missing_roots_are_skipped() {
    let tmp = tempdir().unwrap();
    touch(&tmp.path().join("a.png"));

    let opts = ScanOptions::new(vec![tmp.path().join("gone"), tmp.path().to_path_buf()]);
    let build = Catalog::build(&opts);
    assert_eq!(build.catalog.len(), 1);
    assert_eq!(build.skipped, 1);
}

#[test]
fn rebuild_of_unchanged_tree_is_identical() {
    let tmp = tempdir().unwrap();
    for name in ["x.png", "y.jpg", "z.webp"] {
        touch(&tmp.path().join(name));
    }
    let opts = ScanOptions::new(vec![tmp.path().to_path_buf()]);
    assert_eq!(Catalog::build(&opts).catalog, Catalog::build(&opts).catalog);
}

#[cfg(unix)]
#[test]
fn symlinked_root_file_anchors_its_target() {
    let tmp = tempdir().unwrap();
    let lib = tmp.path().join("lib");
    touch(&lib.join("a.png"));
    touch(&lib.join("b.png"));
    let link = tmp.path().join("link.png");
    std::os::unix::fs::symlink(lib.join("b.png"), &link).unwrap();

    let build = Catalog::build(&ScanOptions::new(vec![lib.clone(), link]));
    assert_eq!(build.anchor, 1);
}
