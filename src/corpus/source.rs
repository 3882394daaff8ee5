//! Opening the annotation source.
//!
//! The input string is either a local path or an absolute URL. A string is
//! treated as remote only when it parses as a URL *and* has a host, so
//! Windows paths like `C:\data\instances.json` (which `url` happily parses with
//! scheme `c`) still go to the filesystem.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use std::time::Duration;

use log::debug;

use crate::error::CocoliftError;

/// Global timeout for fetching a remote annotation file.
const REMOTE_TIMEOUT: Duration = Duration::from_secs(300);

/// Where an annotation source lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Local(PathBuf),
    Remote(url::Url),
}

/// Decide whether `input` names a local file or a remote resource.
pub fn classify_source(input: &str) -> SourceKind {
    match url::Url::parse(input) {
        Ok(url) if url.host_str().is_some_and(|host| !host.is_empty()) => SourceKind::Remote(url),
        _ => SourceKind::Local(PathBuf::from(input)),
    }
}

/// Open `input` as a byte stream.
///
/// # Errors
/// Returns [`CocoliftError::SourceUnavailable`] if the file cannot be opened or
/// the remote request fails (including non-2xx responses).
pub fn open(input: &str) -> Result<Box<dyn Read>, CocoliftError> {
    match classify_source(input) {
        SourceKind::Local(path) => {
            debug!("opening local annotation file {}", path.display());
            let file = File::open(&path).map_err(|source| CocoliftError::SourceUnavailable {
                input: input.to_string(),
                message: source.to_string(),
            })?;
            Ok(Box::new(BufReader::new(file)))
        }
        SourceKind::Remote(url) => {
            debug!("fetching remote annotation file {url}");
            let config = ureq::Agent::config_builder()
                .timeout_global(Some(REMOTE_TIMEOUT))
                .build();
            let agent: ureq::Agent = config.into();

            let response =
                agent
                    .get(url.as_str())
                    .call()
                    .map_err(|source| CocoliftError::SourceUnavailable {
                        input: input.to_string(),
                        message: source.to_string(),
                    })?;

            Ok(Box::new(BufReader::new(response.into_body().into_reader())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_urls_are_remote() {
        let kind = classify_source("http://images.cocodataset.org/annotations/instances_val2017.json");
        match kind {
            SourceKind::Remote(url) => assert_eq!(url.host_str(), Some("images.cocodataset.org")),
            other => panic!("expected remote, got {other:?}"),
        }
    }

    #[test]
    fn plain_paths_are_local() {
        assert_eq!(
            classify_source("annotations/instances_val2017.json"),
            SourceKind::Local(PathBuf::from("annotations/instances_val2017.json"))
        );
        assert_eq!(
            classify_source("/data/coco.json"),
            SourceKind::Local(PathBuf::from("/data/coco.json"))
        );
    }

    #[test]
    fn urls_without_host_are_local() {
        assert!(matches!(
            classify_source("file:///data/coco.json"),
            SourceKind::Local(_)
        ));
        assert!(matches!(
            classify_source(r"C:\data\coco.json"),
            SourceKind::Local(_)
        ));
    }

    #[test]
    fn missing_local_file_is_unavailable() {
        let err = open("definitely/not/here.json").err().expect("should fail");
        assert!(matches!(err, CocoliftError::SourceUnavailable { .. }));
    }
}
