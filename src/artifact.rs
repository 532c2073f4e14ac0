//! Acquisition of deployment artifacts from a URI.

use std::{fmt::Display, path::PathBuf, str::FromStr};

use log::debug;
use sha2::{Digest, Sha256};
use url::Url;

use crate::{Error, ErrorKind, Result};

/// Where a deployment artifact is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactUri {
    Http(Url),
    File(PathBuf),
}

impl FromStr for ArtifactUri {
    type Err = Error;

    fn from_str(uri: &str) -> Result<Self> {
        let unsupported = || {
            Error::new(format!("unsupported artifact URI `{}`", uri))
                .with_kind(ErrorKind::UnsupportedScheme)
                .with_explanation(
                    "The artifact URI must use either the `http`, `https` or `file` scheme.",
                )
        };

        let url = Url::parse(uri).map_err(|err| unsupported().with_source(err))?;

        match url.scheme() {
            "http" | "https" => Ok(Self::Http(url)),
            "file" => url.to_file_path().map(Self::File).map_err(|_| {
                Error::new(format!("invalid file URI `{}`", uri))
                    .with_kind(ErrorKind::UnsupportedScheme)
                    .with_explanation(
                        "The file URI could not be converted to a local path. It must be absolute, like `file:///tmp/function.zip`.",
                    )
            }),
            _ => Err(unsupported()),
        }
    }
}

impl Display for ArtifactUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(url) => write!(f, "{}", url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl ArtifactUri {
    /// Reads the artifact bytes in a single attempt.
    pub async fn fetch(&self) -> Result<Vec<u8>> {
        let bytes = match self {
            Self::Http(url) => {
                let response = reqwest::get(url.clone())
                    .await
                    .and_then(|response| response.error_for_status())
                    .map_err(|err| {
                        Error::new("failed to download artifact")
                            .with_kind(ErrorKind::Io)
                            .with_source(err)
                    })?;

                response
                    .bytes()
                    .await
                    .map_err(|err| {
                        Error::new("failed to download artifact")
                            .with_kind(ErrorKind::Io)
                            .with_source(err)
                    })?
                    .to_vec()
            }
            Self::File(path) => tokio::fs::read(path).await.map_err(|err| {
                Error::new("failed to read artifact")
                    .with_kind(ErrorKind::Io)
                    .with_source(err)
                    .with_explanation(format!(
                        "The artifact `{}` could not be read. Please check that it exists and that you have the correct permissions.",
                        path.display()
                    ))
            })?,
        };

        debug!("Read {} byte(s) from artifact `{}`", bytes.len(), self);

        Ok(bytes)
    }
}

/// The base64-encoded SHA-256 digest of a function package, in the format
/// the function service reports as `CodeSha256`.
pub fn code_sha256(bytes: &[u8]) -> String {
    base64::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;

    #[test]
    fn test_parse_artifact_uri() {
        assert_eq!(
            "file:///tmp/fn.zip".parse::<ArtifactUri>().unwrap(),
            ArtifactUri::File(PathBuf::from("/tmp/fn.zip"))
        );
        assert!(matches!(
            "https://example.com/fn.zip".parse::<ArtifactUri>().unwrap(),
            ArtifactUri::Http(_)
        ));
        assert!(matches!(
            "http://example.com/fn.zip".parse::<ArtifactUri>().unwrap(),
            ArtifactUri::Http(_)
        ));
    }

    #[test]
    fn test_parse_artifact_uri_unsupported() {
        for uri in ["s3://bucket/fn.zip", "ftp://example.com/fn.zip", "/tmp/fn.zip"] {
            let err = uri.parse::<ArtifactUri>().unwrap_err();

            assert_eq!(err.kind(), ErrorKind::UnsupportedScheme, "uri: {}", uri);
        }
    }

    #[tokio::test]
    async fn test_fetch_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"zip bytes").unwrap();

        let uri = Url::from_file_path(file.path()).unwrap().to_string();
        let bytes = uri.parse::<ArtifactUri>().unwrap().fetch().await.unwrap();

        assert_eq!(bytes, b"zip bytes");
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let uri = Url::from_file_path(dir.path().join("missing.zip"))
            .unwrap()
            .to_string();

        let err = uri
            .parse::<ArtifactUri>()
            .unwrap()
            .fetch()
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
    }

    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{}/fn.zip", addr)
    }

    #[tokio::test]
    async fn test_fetch_http() {
        let uri = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 3\r\nConnection: close\r\n\r\nabc",
        )
        .await;

        let bytes = uri.parse::<ArtifactUri>().unwrap().fetch().await.unwrap();

        assert_eq!(bytes, b"abc");
    }

    #[tokio::test]
    async fn test_fetch_http_error_status() {
        let uri = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let err = uri
            .parse::<ArtifactUri>()
            .unwrap()
            .fetch()
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_code_sha256() {
        assert_eq!(
            code_sha256(b""),
            "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }
}
