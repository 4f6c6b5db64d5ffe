use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{CoreErrorKind, CoreResult};
use crate::transfer::{SourceLocation, Transfer, fetch_error};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(600);

/// Fetches `http`/`https` sources with ureq and copies local or `file://`
/// sources from the filesystem.
pub struct HttpTransfer {
    agent: ureq::Agent,
}

impl HttpTransfer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    fn download(&self, url: &str, destination: &Path) -> CoreResult<()> {
        let response = self.agent.get(url).call().map_err(|error| match error {
            ureq::Error::Status(code, _) => fetch_error(
                CoreErrorKind::FetchFailure,
                format!("'{url}' responded with HTTP status {code}"),
            ),
            ureq::Error::Transport(transport) => fetch_error(
                CoreErrorKind::FetchFailure,
                format!("failed to reach '{url}': {transport}"),
            ),
        })?;

        let partial = partial_path(destination);
        let written = write_partial(&mut response.into_reader(), &partial)
            .and_then(|()| fs::rename(&partial, destination));

        written.map_err(|error| {
            let _ = fs::remove_file(&partial);
            fetch_error(
                CoreErrorKind::FetchFailure,
                format!(
                    "failed to write '{url}' to '{}': {error}",
                    destination.display()
                ),
            )
        })
    }
}

impl Default for HttpTransfer {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl Transfer for HttpTransfer {
    fn fetch(&self, uri: &str, destination: &Path) -> CoreResult<()> {
        if let Some(parent) = destination.parent().filter(|parent| !parent.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(|error| {
                fetch_error(
                    CoreErrorKind::FetchFailure,
                    format!(
                        "failed to create staging directory '{}': {error}",
                        parent.display()
                    ),
                )
            })?;
        }

        match SourceLocation::parse(uri)? {
            SourceLocation::Http(url) => self.download(&url, destination),
            SourceLocation::Local(path) => copy_local(&path, destination),
        }
    }
}

fn copy_local(source: &Path, destination: &Path) -> CoreResult<()> {
    fs::copy(source, destination).map(|_| ()).map_err(|error| {
        fetch_error(
            CoreErrorKind::FetchFailure,
            format!(
                "failed to copy '{}' to '{}': {error}",
                source.display(),
                destination.display()
            ),
        )
    })
}

fn write_partial(reader: &mut impl io::Read, partial: &Path) -> io::Result<()> {
    let mut file = File::create(partial)?;
    io::copy(reader, &mut file)?;
    file.flush()?;
    file.sync_all()
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut rendered = destination.as_os_str().to_owned();
    rendered.push(".part");
    PathBuf::from(rendered)
}
