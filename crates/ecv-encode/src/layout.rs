use std::ffi::OsString;
use std::path::{Path, PathBuf};

use ecv_types::ShardIndex;

/// File an engine writes shard `index` of `input` to: `<input>.<index>`.
pub fn shard_path(input: &Path, index: ShardIndex) -> PathBuf {
    with_suffix(input, &index.to_string())
}

/// File an engine writes reconstructed data to: `<input>.decoded`.
pub fn decoded_path(input: &Path) -> PathBuf {
    with_suffix(input, "decoded")
}

fn with_suffix(input: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_is_appended_not_substituted() {
        let input = Path::new("/tmp/erasure-code/obj_-2/ec-obj");
        assert_eq!(
            shard_path(input, ShardIndex::new(4)),
            PathBuf::from("/tmp/erasure-code/obj_-2/ec-obj.4")
        );
        assert_eq!(
            shard_path(Path::new("data.bin"), ShardIndex::new(0)),
            PathBuf::from("data.bin.0")
        );
        assert_eq!(decoded_path(input), PathBuf::from("/tmp/erasure-code/obj_-2/ec-obj.decoded"));
    }
}
