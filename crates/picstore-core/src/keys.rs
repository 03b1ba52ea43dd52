//! Object-key generation and sanitization.
//!
//! Keys are versioned under `@v4/` and tenant-scoped as `{store_id}/{key}` at
//! write time. Derived variants live under `imgs/{label}/{key}.webp|.avif` so
//! their public URLs are predictable before the bytes exist (the async callback
//! path writes to exactly the key the upload response already advertised).

use chrono::Utc;

/// Version prefix for generated object keys.
pub const KEY_PREFIX: &str = "@v4/";

/// Sanitize a caller-supplied directory: keep word characters, hyphens and
/// slashes, strip the leading slash, collapse repeated slashes, lowercase.
/// Returns `None` when nothing safe remains.
pub fn sanitize_directory(directory: &str) -> Option<String> {
    let cleaned: String = directory
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || *c == '/')
        .collect();

    let segments: Vec<&str> = cleaned.split('/').filter(|s| !s.is_empty()).collect();

    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/").to_lowercase())
}

/// Sanitize an uploaded filename: keep word characters, hyphens and dots, lowercase.
pub fn sanitize_filename(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || *c == '.')
        .collect();
    if safe.is_empty() {
        "file".to_string()
    } else {
        safe.to_lowercase()
    }
}

/// Generate the unique object key for one upload:
/// `@v4/[{directory}/]{timestamp}-{filename}`.
pub fn generate_key(directory: Option<&str>, filename: &str) -> String {
    let mut key = String::from(KEY_PREFIX);
    if let Some(dir) = directory.and_then(sanitize_directory) {
        key.push_str(&dir);
        key.push('/');
    }
    let token = Utc::now().timestamp_millis();
    key.push_str(&format!("{}-{}", token, sanitize_filename(filename)));
    key
}

/// Full storage key for one tenant: `{store_id}/{key}`.
pub fn storage_key(store_id: u64, key: &str) -> String {
    format!("{}/{}", store_id, key)
}

/// Storage key (relative to the tenant prefix) for one derived variant.
pub fn variant_key(label: &str, key: &str, next_gen: bool) -> String {
    let ext = if next_gen { "avif" } else { "webp" };
    format!("imgs/{}/{}.{}", label, key, ext)
}

/// Public URI for an object, via the CDN host or a bucket host.
pub fn mount_uri(host: &str, store_id: u64, key: &str) -> String {
    format!("https://{}/{}/{}", host, store_id, key)
}

/// Whether an S3 passthrough `Key`/`Prefix` value still needs the tenant prefix
/// (it does unless it already starts with three or more digits and a slash).
pub fn needs_store_prefix(value: &str) -> bool {
    let digits = value.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits < 3 {
        return true;
    }
    value.chars().nth(digits) != Some('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_normalizes_dotdot_and_double_slashes() {
        assert_eq!(sanitize_directory("/a/../b"), Some("a/b".to_string()));
        assert_eq!(sanitize_directory("/a//b"), Some("a/b".to_string()));
        assert_eq!(sanitize_directory("/Shop/Covers/"), Some("shop/covers".to_string()));
    }

    #[test]
    fn directory_strips_unsafe_characters() {
        assert_eq!(sanitize_directory("/a b!/c#d"), Some("ab/cd".to_string()));
        assert_eq!(sanitize_directory("///"), None);
        assert_eq!(sanitize_directory("...."), None);
    }

    #[test]
    fn filename_keeps_word_chars_dots_and_hyphens() {
        assert_eq!(sanitize_filename("My Photo (1).JPG"), "myphoto1.jpg");
        assert_eq!(sanitize_filename("çç"), "file");
    }

    #[test]
    fn generated_key_is_versioned_and_scoped() {
        let key = generate_key(Some("/Products//Shoes"), "Pic.png");
        assert!(key.starts_with("@v4/products/shoes/"));
        assert!(key.ends_with("-pic.png"));
        assert_eq!(storage_key(123, "@v4/a.png"), "123/@v4/a.png");
    }

    #[test]
    fn variant_keys_and_uris_are_predictable() {
        assert_eq!(
            variant_key("big", "@v4/a.png", false),
            "imgs/big/@v4/a.png.webp"
        );
        assert_eq!(
            variant_key("normal", "@v4/a.png", true),
            "imgs/normal/@v4/a.png.avif"
        );
        assert_eq!(
            mount_uri("cdn.example.com", 123, "@v4/a.png"),
            "https://cdn.example.com/123/@v4/a.png"
        );
    }

    #[test]
    fn store_prefix_detection() {
        assert!(needs_store_prefix("@v4/a.png"));
        assert!(needs_store_prefix("12/a.png"));
        assert!(!needs_store_prefix("123/a.png"));
        assert!(needs_store_prefix("1234a.png"));
    }
}
