use std::io::{self, Cursor};
use workforce_core::{
    AttachmentError, AttachmentService, IncomingFile, RejectReason, UploadOutcome,
};

const FOLDER: &str = "images";

fn payload(len: usize) -> Cursor<Vec<u8>> {
    Cursor::new(vec![0xAB; len])
}

fn stored_files(root: &std::path::Path) -> usize {
    match std::fs::read_dir(root.join(FOLDER)) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

#[test]
fn accepted_png_is_stored_under_generated_key() {
    let root = tempfile::tempdir().unwrap();
    let service = AttachmentService::new(root.path());

    let outcome = service
        .upload(IncomingFile::new("ahmed.png", 1_000_000, payload(1_000_000)), FOLDER)
        .unwrap();
    let key = outcome.into_key().unwrap();

    assert!(key.ends_with(".png"));
    assert!(!key.contains('/'));
    assert_ne!(key, "ahmed.png");

    let stored = service.resolve(FOLDER, &key);
    assert!(stored.starts_with(root.path().join(FOLDER)));
    assert_eq!(std::fs::metadata(&stored).unwrap().len(), 1_000_000);
}

#[test]
fn disallowed_extension_is_rejected_without_writing() {
    let root = tempfile::tempdir().unwrap();
    let service = AttachmentService::new(root.path());

    let outcome = service
        .upload(IncomingFile::new("clip.gif", 10, payload(10)), FOLDER)
        .unwrap();
    assert_eq!(
        outcome,
        UploadOutcome::Rejected(RejectReason::ExtensionNotAllowed(Some(".gif".to_string())))
    );
    assert!(!root.path().join(FOLDER).exists());
}

#[test]
fn uppercase_extension_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let service = AttachmentService::new(root.path());

    let outcome = service
        .upload(IncomingFile::new("scan.PNG", 10, payload(10)), FOLDER)
        .unwrap();
    assert!(outcome.is_rejected());
}

#[test]
fn size_limit_rejects_at_and_above_two_mebibytes() {
    let root = tempfile::tempdir().unwrap();
    let service = AttachmentService::new(root.path());

    for length in [2_097_152_u64, 2_097_153] {
        let outcome = service
            .upload(IncomingFile::new("big.jpg", length, io::empty()), FOLDER)
            .unwrap();
        assert_eq!(
            outcome,
            UploadOutcome::Rejected(RejectReason::TooLarge {
                length,
                max: 2_097_152
            })
        );
    }

    let outcome = service
        .upload(IncomingFile::new("fits.jpg", 2_097_151, payload(2_097_151)), FOLDER)
        .unwrap();
    assert!(outcome.key().is_some());
}

#[test]
fn same_name_uploads_get_distinct_keys() {
    let root = tempfile::tempdir().unwrap();
    let service = AttachmentService::new(root.path());

    let first = service
        .upload(IncomingFile::new("photo.jpeg", 3, payload(3)), FOLDER)
        .unwrap()
        .into_key()
        .unwrap();
    let second = service
        .upload(IncomingFile::new("photo.jpeg", 3, payload(3)), FOLDER)
        .unwrap()
        .into_key()
        .unwrap();

    assert_ne!(first, second);
    assert!(service.resolve(FOLDER, &first).exists());
    assert!(service.resolve(FOLDER, &second).exists());
}

#[test]
fn short_payload_is_discarded() {
    let root = tempfile::tempdir().unwrap();
    let service = AttachmentService::new(root.path());

    let err = service
        .upload(IncomingFile::new("short.png", 1_000, payload(10)), FOLDER)
        .unwrap_err();
    assert!(matches!(
        err,
        AttachmentError::LengthMismatch {
            declared: 1_000,
            written: 10
        }
    ));
    assert_eq!(stored_files(root.path()), 0);
}

#[test]
fn payload_longer_than_declared_is_discarded() {
    let root = tempfile::tempdir().unwrap();
    let service = AttachmentService::new(root.path());

    let err = service
        .upload(IncomingFile::new("long.png", 10, payload(3 * 1024 * 1024)), FOLDER)
        .unwrap_err();
    assert!(matches!(
        err,
        AttachmentError::LengthMismatch {
            declared: 10,
            written: 11
        }
    ));
    assert_eq!(stored_files(root.path()), 0);
}

#[test]
fn dotfile_name_keeps_its_extension() {
    let root = tempfile::tempdir().unwrap();
    let service = AttachmentService::new(root.path());

    let key = service
        .upload(IncomingFile::new(".png", 4, payload(4)), FOLDER)
        .unwrap()
        .into_key()
        .unwrap();
    assert!(key.ends_with(".png"));
    assert_eq!(std::fs::read(service.resolve(FOLDER, &key)).unwrap(), vec![0xAB; 4]);
}

#[test]
fn delete_reports_whether_a_file_was_removed() {
    let root = tempfile::tempdir().unwrap();
    let service = AttachmentService::new(root.path());

    let key = service
        .upload(IncomingFile::new("ahmed.png", 8, payload(8)), FOLDER)
        .unwrap()
        .into_key()
        .unwrap();

    assert!(service.delete(FOLDER, &key));
    assert!(!service.resolve(FOLDER, &key).exists());
    assert!(!service.delete(FOLDER, &key));
    assert!(!service.delete_path(root.path().join("never-existed.png")));
}

#[tokio::test]
async fn async_upload_streams_to_disk() {
    let root = tempfile::tempdir().unwrap();
    let service = AttachmentService::new(root.path());

    let outcome = service
        .upload_async(
            IncomingFile::new("ahmed.jpg", 1024, &[7_u8; 1024][..]),
            FOLDER,
        )
        .await
        .unwrap();
    let key = outcome.into_key().unwrap();
    assert!(key.ends_with(".jpg"));

    let stored = tokio::fs::read(service.resolve(FOLDER, &key)).await.unwrap();
    assert_eq!(stored.len(), 1024);

    let rejected = service
        .upload_async(IncomingFile::new("notes.txt", 4, &b"text"[..]), FOLDER)
        .await
        .unwrap();
    assert!(rejected.is_rejected());
}

#[tokio::test]
async fn async_upload_discards_length_mismatch() {
    let root = tempfile::tempdir().unwrap();
    let service = AttachmentService::new(root.path());

    let err = service
        .upload_async(IncomingFile::new("short.jpg", 64, &[1_u8; 8][..]), FOLDER)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AttachmentError::LengthMismatch {
            declared: 64,
            written: 8
        }
    ));

    let err = service
        .upload_async(IncomingFile::new("long.jpg", 4, &[1_u8; 64][..]), FOLDER)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AttachmentError::LengthMismatch {
            declared: 4,
            written: 5
        }
    ));
    assert_eq!(stored_files(root.path()), 0);
}
