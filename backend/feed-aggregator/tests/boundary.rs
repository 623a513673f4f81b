use std::fs;
use std::path::{Path, PathBuf};

fn collect_rs_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        if let Ok(read_dir) = fs::read_dir(&dir) {
            for entry in read_dir.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if path.extension().map(|e| e == "rs").unwrap_or(false) {
                    files.push(path);
                }
            }
        }
    }
    files
}

fn file_contains(path: &Path, needle: &str) -> bool {
    fs::read_to_string(path)
        .map(|c| c.contains(needle))
        .unwrap_or(false)
}

#[test]
fn services_reach_the_social_api_only_through_traits() {
    let services_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("services");

    let files = collect_rs_files(&services_root);
    assert!(!files.is_empty(), "no service sources found");

    let offenders: Vec<String> = files
        .iter()
        .filter(|f| {
            file_contains(f, "reqwest")
                || file_contains(f, "SocialApiClient")
                || file_contains(f, "actix_web")
        })
        .map(|f| f.to_string_lossy().to_string())
        .collect();

    if !offenders.is_empty() {
        panic!(
            "Services must depend on SocialBackend/PostSource, not on HTTP types. Offenders: {:?}",
            offenders
        );
    }
}
