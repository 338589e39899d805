//! Tests for viewer URL construction and file id extraction.

use drive_catalog::file_ref::{parse_file_ref, viewer_url};

mod viewer_links {
    use super::*;

    #[test]
    fn viewer_url_format() {
        assert_eq!(viewer_url("1abc123XYZ"), "https://drive.google.com/open?id=1abc123XYZ");
    }

    #[test]
    fn open_url_http() {
        let url = "http://drive.google.com/open?id=1abc123XYZ";
        assert_eq!(parse_file_ref(url).unwrap(), "1abc123XYZ");
    }

    #[test]
    fn open_url_with_extra_params() {
        let url = "https://drive.google.com/open?id=1abc123XYZ&authuser=0";
        assert_eq!(parse_file_ref(url).unwrap(), "1abc123XYZ");
    }
}

mod shared_links {
    use super::*;

    #[test]
    fn file_view_link() {
        let url = "https://drive.google.com/file/d/1abc123XYZ/view?usp=sharing";
        assert_eq!(parse_file_ref(url).unwrap(), "1abc123XYZ");
    }

    #[test]
    fn spreadsheet_link() {
        let url = "https://docs.google.com/spreadsheets/d/1Sheet_-9/edit#gid=0";
        assert_eq!(parse_file_ref(url).unwrap(), "1Sheet_-9");
    }

    #[test]
    fn document_link() {
        let url = "https://docs.google.com/document/d/1Doc/edit";
        assert_eq!(parse_file_ref(url).unwrap(), "1Doc");
    }

    #[test]
    fn folder_link_with_user() {
        let url = "https://drive.google.com/drive/u/1/folders/1Folder";
        assert_eq!(parse_file_ref(url).unwrap(), "1Folder");
    }
}

mod raw_ids {
    use super::*;

    #[test]
    fn mixed_id() {
        assert_eq!(parse_file_ref("abc-123_XYZ").unwrap(), "abc-123_XYZ");
    }

    #[test]
    fn whitespace_trimmed() {
        assert_eq!(parse_file_ref("\t1abc123XYZ\n").unwrap(), "1abc123XYZ");
    }
}

mod invalid_inputs {
    use super::*;

    #[test]
    fn malformed_drive_url() {
        assert!(parse_file_ref("https://drive.google.com/").is_err());
        assert!(parse_file_ref("https://drive.google.com/open?id=").is_err());
    }

    #[test]
    fn invalid_characters_in_id() {
        assert!(parse_file_ref("abc 123").is_err());
        assert!(parse_file_ref("abc/123").is_err());
        assert!(parse_file_ref("abc@123").is_err());
    }

    #[test]
    fn error_mentions_input() {
        let err = parse_file_ref("not an id").unwrap_err();
        assert!(err.to_string().contains("not an id"));
    }
}
