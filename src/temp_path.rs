use std::path::PathBuf;

use rand::distributions::{Alphanumeric, DistString};

const DIR: &str = "/tmp/";
const EXT: &str = ".json";
const RANDOM_LEN: usize = 8;

/// Returns `/tmp/{prefix}-{random}.json`, used to keep manifests the control plane rejected.
pub fn tmp_json_path(prefix: &str) -> PathBuf {
    let mut path = String::with_capacity(DIR.len() + prefix.len() + 1 + RANDOM_LEN + EXT.len());
    path.push_str(DIR);
    if !prefix.is_empty() {
        path.push_str(prefix);
        path.push('-');
    }
    Alphanumeric.append_string(&mut rand::thread_rng(), &mut path, RANDOM_LEN);
    path.push_str(EXT);
    path.into()
}
