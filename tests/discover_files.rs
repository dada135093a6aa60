use ocr_batch::discover::{discover, FileCategory};
use tempfile::tempdir;

fn touch(dir: &std::path::Path, name: &str) {
    std::fs::write(dir.join(name), b"x").unwrap();
}

#[test]
fn categorizes_by_extension_case_insensitively() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "a.png");
    touch(dir.path(), "b.PDF");
    touch(dir.path(), "c.txt");
    touch(dir.path(), "d.JPEG");
    touch(dir.path(), "e.webp");

    let set = discover(dir.path()).unwrap();
    assert_eq!(set.images.len(), 3);
    assert_eq!(set.documents.len(), 1);
    assert_eq!(set.total(), 4);

    let names: Vec<String> = set.iter().map(|f| f.file_name()).collect();
    assert!(!names.contains(&"c.txt".to_string()));
    assert!(names.contains(&"b.PDF".to_string()));
}

#[test]
fn each_file_appears_exactly_once() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "scan.TIFF");

    let set = discover(dir.path()).unwrap();
    assert_eq!(set.total(), 1);
    assert_eq!(set.images[0].category, FileCategory::Image);
}

#[test]
fn images_come_before_documents() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "z.pdf");
    touch(dir.path(), "a.jpg");

    let set = discover(dir.path()).unwrap();
    let cats: Vec<FileCategory> = set.iter().map(|f| f.category).collect();
    assert_eq!(cats, vec![FileCategory::Image, FileCategory::Document]);
}

#[test]
fn directories_and_nested_files_are_ignored() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join("fake.png")).unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    touch(&dir.path().join("sub"), "nested.png");
    touch(dir.path(), "real.png");

    let set = discover(dir.path()).unwrap();
    assert_eq!(set.total(), 1);
    assert_eq!(set.images[0].file_name(), "real.png");
}

#[test]
fn empty_directory_yields_empty_set() {
    let dir = tempdir().unwrap();
    let set = discover(dir.path()).unwrap();
    assert!(set.is_empty());
}

#[test]
fn non_directory_input_is_an_error() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "a.png");
    assert!(discover(&dir.path().join("a.png")).is_err());
}
