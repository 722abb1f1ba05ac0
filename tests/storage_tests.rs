use postboard::storage::{MockStorageService, S3StorageClient, StorageService, image_object_key};

mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn mock_success_embeds_key() {
        let mock = MockStorageService::new();
        let key = image_object_key("cat.png", "image/png");

        let url = mock.get_presigned_upload_url(&key, "image/png").await.unwrap();
        assert!(url.contains("signature=fake"));
        assert!(url.contains(&key));
    }

    #[tokio::test]
    async fn mock_failure() {
        let mock = MockStorageService::new_failing();
        let result = mock.get_presigned_upload_url("images/a.png", "image/png").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn mock_sanitizes_traversal() {
        let mock = MockStorageService::new();
        let url = mock
            .get_presigned_upload_url("images/../../etc/passwd", "image/png")
            .await
            .unwrap();
        assert!(!url.contains(".."));
    }
}

mod key_tests {
    use super::*;

    #[test]
    fn keys_live_under_images_and_are_unique() {
        let first = image_object_key("photo.jpeg", "image/jpeg");
        let second = image_object_key("photo.jpeg", "image/jpeg");
        assert!(first.starts_with("images/"));
        assert!(first.ends_with(".jpeg"));
        assert_ne!(first, second);
    }

    #[test]
    fn client_filename_cannot_escape_prefix() {
        let key = image_object_key("../../../etc/passwd", "image/png");
        assert!(key.starts_with("images/"));
        assert!(!key.contains(".."));
        assert_eq!(key.matches('/').count(), 1);
    }
}

mod s3_tests {
    use super::*;

    #[tokio::test]
    async fn presigned_url_targets_endpoint_and_key() {
        let client = S3StorageClient::new(
            "http://localhost:9000",
            "us-east-1",
            "testkey",
            "testsecret",
            "testbucket",
        )
        .await;

        let key = image_object_key("cover.webp", "image/webp");
        let url = client.get_presigned_upload_url(&key, "image/webp").await.unwrap();

        assert!(url.contains("localhost:9000"));
        assert!(url.contains("testbucket"));
        assert!(url.contains(&key));
    }
}
