/* These tests live in a separate file so that edits to the error module
itself do not shift the line numbers the expect-test snapshots were taken
against. */

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::{FilestageError, FilestageResult, ResultExt};
    use expect_test::expect;
    use std::error::Error;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let path = PathBuf::from("test.dat");
        let kind = ErrorKind::Io {
            path: path.clone(),
            source: io_err,
        };
        let error = FilestageError::new(kind);

        match error.kind() {
            ErrorKind::Io { path: p, .. } => {
                assert_eq!(p, &path);
            }
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn test_error_from_message() {
        let error = FilestageError::message("something went wrong");

        match error.kind() {
            ErrorKind::Message { message } => {
                assert_eq!(message, "something went wrong");
            }
            _ => panic!("Expected Message variant"),
        }
    }

    #[test]
    fn test_error_context_attachment() {
        let error = FilestageError::message("original error")
            .context("first context")
            .context("second context");

        assert_eq!(error.get_context().len(), 2);
        assert_eq!(error.get_context()[0], "first context");
        assert_eq!(error.get_context()[1], "second context");
    }

    #[test]
    fn test_error_display_message_only() {
        let error = FilestageError::message("test message");
        expect![[r#"test message"#]].assert_eq(&error.to_string());
    }

    #[test]
    fn test_error_display_with_context() {
        let error = FilestageError::message("test message").context("operation failed");
        expect![[r#"operation failed: test message"#]].assert_eq(&error.to_string());
    }

    #[test]
    fn test_error_display_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "not found");
        let error = FilestageError::new(ErrorKind::Io {
            path: PathBuf::from("/tmp/test.dat"),
            source: io_err,
        });
        expect![[r#"file operation failed at /tmp/test.dat: not found"#]]
            .assert_eq(&error.to_string());
    }

    #[test]
    fn test_error_display_path_too_long() {
        let error = FilestageError::new(ErrorKind::PathTooLong {
            path: PathBuf::from("/very/long"),
            units: 5000,
        });
        expect![[r#"path of 5000 native units exceeds the supported bound: /very/long"#]]
            .assert_eq(&error.to_string());
    }

    #[test]
    fn test_error_source_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error = FilestageError::new(ErrorKind::Io {
            path: PathBuf::from("test.dat"),
            source: io_err,
        });
        assert!(error.source().is_some());
    }

    #[test]
    fn test_error_source_message() {
        let error = FilestageError::message("test");
        assert!(error.source().is_none());
    }

    #[test]
    fn test_error_root_cause_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "not found");
        let error = FilestageError::new(ErrorKind::Io {
            path: PathBuf::from("test.dat"),
            source: io_err,
        });
        assert_eq!(error.root_cause().to_string(), "not found");
    }

    #[test]
    fn test_error_root_cause_message() {
        // With no source, the root cause is the error itself.
        let error = FilestageError::message("test");
        assert_eq!(error.root_cause().to_string(), "test");
    }

    #[test]
    fn test_result_ext_context_success() {
        let result: FilestageResult<i32> = Ok(42);
        let final_result = result.context("operation failed");
        assert_eq!(final_result.unwrap(), 42);
    }

    #[test]
    fn test_result_ext_context_error() {
        let result: FilestageResult<i32> = Err(Box::new(FilestageError::message("original")));
        let final_result = result.context("operation failed");
        let err = final_result.unwrap_err();
        assert_eq!(err.to_string(), "operation failed: original");
    }

    #[test]
    fn test_result_ext_with_context_lazy() {
        let result: FilestageResult<i32> = Ok(42);
        let final_result = result.with_context(|| unreachable!("must not run on success"));
        assert_eq!(final_result.unwrap(), 42);
    }

    #[test]
    fn test_result_ext_chaining() {
        let result: FilestageResult<i32> = Err(Box::new(FilestageError::message("root")));
        let final_result = result
            .context("step 1")
            .context("step 2")
            .with_context(|| "step 3".to_string());
        let err = final_result.unwrap_err();
        assert_eq!(err.to_string(), "step 1: step 2: step 3: root");
    }
}
