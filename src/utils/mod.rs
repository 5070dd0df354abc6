pub mod constants;
pub mod string_utils;
pub mod url_utils;

pub use constants::*;
pub use string_utils::{safe_truncate_boundary, safe_truncate_chars};
pub use url_utils::{
    file_path_for_url, glob_match, is_valid_url, matches_any, normalize_url, safe_filename_for_url,
};
