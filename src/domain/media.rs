//! 媒体类型辅助

/// 无 MIME 信息时使用的图片扩展名
pub const FALLBACK_IMAGE_EXTENSION: &str = "png";

/// 附件声明的 MIME 类型是否属于 image 族
pub fn is_image_mime(mime: &str) -> bool {
    mime.trim().to_ascii_lowercase().starts_with("image/")
}

/// 由 MIME 子类型推导文件扩展名
///
/// `image/jpeg` -> `jpeg`，`image/png; q=1` -> `png`，缺失或无法解析时回退到 `png`
pub fn extension_for_mime(mime: Option<&str>) -> String {
    mime.and_then(|m| m.split(';').next())
        .and_then(|m| m.split_once('/'))
        .map(|(_, subtype)| subtype.trim().to_ascii_lowercase())
        .filter(|subtype| !subtype.is_empty())
        .unwrap_or_else(|| FALLBACK_IMAGE_EXTENSION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_mime() {
        assert!(is_image_mime("image/png"));
        assert!(is_image_mime("IMAGE/JPEG"));
        assert!(!is_image_mime("text/plain"));
        assert!(!is_image_mime("application/octet-stream"));
    }

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for_mime(Some("image/jpeg")), "jpeg");
        assert_eq!(extension_for_mime(Some("image/webp; charset=binary")), "webp");
        assert_eq!(extension_for_mime(Some("garbage")), "png");
        assert_eq!(extension_for_mime(None), "png");
    }
}
