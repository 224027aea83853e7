//! Cache key derivation.
//!
//! Keys double as artifact file names on the derivative store, so the
//! scheme is pinned: origin prefix stripped, path separators flattened
//! to `-`, variant-specific suffix. Width/height land in the key as the
//! raw request strings (including the literal `auto`).

fn normalized_stem(url: &str, prefix: &str) -> String {
    url.strip_prefix(prefix).unwrap_or(url).replace('/', "-")
}

pub fn image_key(url: &str, prefix: &str, width: &str, height: &str) -> String {
    format!(
        "{}-width={}-height={}.jpeg",
        normalized_stem(url, prefix),
        width,
        height
    )
}

pub fn blur_key(url: &str, prefix: &str) -> String {
    format!("{}-blur.png", normalized_stem(url, prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "http://nasust.hatenablog.com/";

    #[test]
    fn image_key_flattens_path_and_appends_size() {
        let key = image_key(
            "http://nasust.hatenablog.com/entry/2016/foo",
            PREFIX,
            "320",
            "auto",
        );
        assert_eq!(key, "entry-2016-foo-width=320-height=auto.jpeg");
    }

    #[test]
    fn auto_sizes_appear_verbatim() {
        let key = image_key("http://nasust.hatenablog.com/entry/foo", PREFIX, "auto", "auto");
        assert_eq!(key, "entry-foo-width=auto-height=auto.jpeg");
    }

    #[test]
    fn blur_key_uses_png_suffix() {
        let key = blur_key("http://nasust.hatenablog.com/entry/2016/foo", PREFIX);
        assert_eq!(key, "entry-2016-foo-blur.png");
    }

    #[test]
    fn identical_requests_produce_identical_keys() {
        let a = image_key("http://nasust.hatenablog.com/entry/x", PREFIX, "640", "auto");
        let b = image_key("http://nasust.hatenablog.com/entry/x", PREFIX, "640", "auto");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_sizes_do_not_collide() {
        let a = image_key("http://nasust.hatenablog.com/entry/x", PREFIX, "640", "auto");
        let b = image_key("http://nasust.hatenablog.com/entry/x", PREFIX, "320", "auto");
        assert_ne!(a, b);
    }
}
