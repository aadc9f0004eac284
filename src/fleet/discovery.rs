//! Container discovery: invoke the external listing and parse its tabular
//! output into target names.

use std::sync::LazyLock;

use regex::Regex;

/// Header sentinel in the listing's final column; the header line is
/// dropped during parsing.
const NAMES_HEADER: &str = "NAMES";

/// Columns in the tabular listing are separated by runs of two or more
/// spaces; a name never contains such a run.
static COLUMN_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("column separator pattern compiles"));

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to invoke container listing: {0}")]
    Invoke(#[source] std::io::Error),
    #[error("container listing exited with {status}: {stderr}")]
    Listing {
        status: std::process::ExitStatus,
        stderr: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Produces the raw tabular text of currently running containers.
pub trait ContainerLister: Send + Sync + 'static {
    fn list(&self) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// Lists containers by running `docker ps`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DockerPs;

impl ContainerLister for DockerPs {
    fn list(&self) -> impl std::future::Future<Output = Result<String>> + Send {
        async {
            let output = tokio::process::Command::new("docker")
                .arg("ps")
                .output()
                .await
                .map_err(Error::Invoke)?;
            if !output.status.success() {
                return Err(Error::Listing {
                    status: output.status,
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
                });
            }
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        }
    }
}

/// Extracts target names from the tabular listing.
///
/// Each line's last column is the name; blank lines and the header line are
/// dropped. Pure parsing, no side effects.
pub fn parse_container_names(raw: &str) -> Vec<String> {
    raw.lines()
        .filter_map(|line| COLUMN_SEPARATOR.split(line.trim_end()).last())
        .filter(|name| !name.is_empty() && *name != NAMES_HEADER)
        .map(str::to_owned)
        .collect()
}
