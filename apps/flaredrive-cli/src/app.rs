//! Command execution.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use flaredrive_transfer::LocalFile;
use flaredrive_upload_queue::{
    ImageThumbnailRenderer, QueueEvent, TaskState, TransferQueue, TransferTask,
};
use flaredrive_write_api::{ApiError, WriteApiClient, object_key};
use tracing::{debug, error, info};

use crate::cli::Command;
use crate::config::Config;

/// Outcome of one command.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
}

impl Summary {
    fn exit_code(self) -> ExitCode {
        if self.failed == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

/// Runs `command` against the configured deployment.
pub async fn run(config: Config, command: Command) -> anyhow::Result<ExitCode> {
    let client = WriteApiClient::http(&config.endpoint)?;
    let summary = execute(&client, &config, command).await?;
    Ok(summary.exit_code())
}

/// Executes a command. Only invalid input is returned as an error; request
/// failures are counted in the summary after the session probe ran.
pub async fn execute(
    client: &WriteApiClient,
    config: &Config,
    command: Command,
) -> anyhow::Result<Summary> {
    match command {
        Command::Upload { files } => Ok(upload(client, config, files).await),
        Command::Mkdir { name } => {
            let result = client.create_folder(&config.base_directory, &name).await;
            if let Err(e) = &result {
                if e.is_validation() {
                    return Err(anyhow::anyhow!("{e}"));
                }
            }
            Ok(finish(client, "mkdir", result).await)
        }
        Command::Copy { source, target } => {
            let source = object_key(&config.base_directory, &source);
            let target = object_key(&config.base_directory, &target);
            let result = client.copy_object(&source, &target).await.map(|()| target);
            Ok(finish(client, "copy", result).await)
        }
        Command::Move { source, target } => {
            let source = object_key(&config.base_directory, &source);
            let target = object_key(&config.base_directory, &target);
            let result = client.move_object(&source, &target).await.map(|()| target);
            Ok(finish(client, "move", result).await)
        }
        Command::Delete { key } => {
            let key = object_key(&config.base_directory, &key);
            let result = client.delete_object(&key).await.map(|()| key);
            Ok(finish(client, "delete", result).await)
        }
        Command::Probe => match client.recover_session().await {
            Some(location) => {
                println!("session expired, sign in at {location}");
                Ok(Summary {
                    succeeded: 0,
                    failed: 1,
                })
            }
            None => {
                println!("session ok");
                Ok(Summary {
                    succeeded: 1,
                    failed: 0,
                })
            }
        },
    }
}

async fn finish(
    client: &WriteApiClient,
    operation: &str,
    result: Result<String, ApiError>,
) -> Summary {
    match result {
        Ok(key) => {
            println!("{operation}: {key}");
            Summary {
                succeeded: 1,
                failed: 0,
            }
        }
        Err(e) => {
            error!(operation, error = %e, "request failed");
            if let Some(location) = client.recover_session().await {
                println!("session expired, sign in at {location}");
            }
            Summary {
                succeeded: 0,
                failed: 1,
            }
        }
    }
}

async fn upload(client: &WriteApiClient, config: &Config, files: Vec<PathBuf>) -> Summary {
    let queue = TransferQueue::new(
        client.clone(),
        Arc::new(ImageThumbnailRenderer::new()),
        config.queue_config(),
    );
    let mut summary = Summary::default();

    let printer = queue.take_events().map(|mut rx| {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                print_event(&event);
            }
        })
    });

    for path in files {
        match LocalFile::open(&path).await {
            Ok(file) => {
                queue.enqueue(TransferTask::new(
                    config.base_directory.clone(),
                    Arc::new(file),
                ));
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot read file");
                summary.failed += 1;
            }
        }
    }

    for report in queue.drain_all().await {
        match report.state {
            TaskState::Done => summary.succeeded += 1,
            _ => summary.failed += 1,
        }
    }
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "upload finished"
    );

    // Dropping the last queue handle closes the event channel.
    drop(queue);
    if let Some(printer) = printer {
        if let Err(e) = printer.await {
            debug!(error = %e, "event printer stopped");
        }
    }
    summary
}

fn print_event(event: &QueueEvent) {
    match event {
        QueueEvent::State { key, state, .. } => println!("{key}: {state}"),
        QueueEvent::Progress {
            key, loaded, total, ..
        } => debug!(key = %key, loaded, total, "progress"),
        QueueEvent::SessionRedirect { location } => {
            println!("session expired, sign in at {location}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flaredrive_write_api::mock::MockTransport;
    use flaredrive_write_api::{Method, Transport, WriteResponse};

    fn client_with(transport: &Arc<MockTransport>) -> WriteApiClient {
        WriteApiClient::new(Arc::clone(transport) as Arc<dyn Transport>)
    }

    fn config_in(dir: &str) -> Config {
        Config {
            base_directory: dir.into(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn mkdir_with_separator_is_an_error() {
        let transport = MockTransport::object_store().shared();
        let client = client_with(&transport);

        let err = execute(
            &client,
            &config_in(""),
            Command::Mkdir {
                name: "a/b".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("a/b"));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn mkdir_creates_folder_in_base_directory() {
        let transport = MockTransport::object_store().shared();
        let client = client_with(&transport);

        let summary = execute(
            &client,
            &config_in("photos/"),
            Command::Mkdir {
                name: "2024".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(
            transport.requests()[0].key.as_deref(),
            Some("photos/2024")
        );
    }

    #[tokio::test]
    async fn failed_copy_runs_probe() {
        let transport = MockTransport::failing_when(|r| r.method == Method::Put).shared();
        let client = client_with(&transport);

        let summary = execute(
            &client,
            &config_in(""),
            Command::Copy {
                source: "a.txt".into(),
                target: "b.txt".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(summary.failed, 1);

        let reqs = transport.requests();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[1].method, Method::Get);
        assert_eq!(reqs[1].path, "/api/write/");
    }

    #[tokio::test]
    async fn move_resolves_keys_against_base_directory() {
        let transport = MockTransport::object_store().shared();
        let client = client_with(&transport);

        execute(
            &client,
            &config_in("docs"),
            Command::Move {
                source: "old.md".into(),
                target: "new.md".into(),
            },
        )
        .await
        .unwrap();

        let reqs = transport.requests();
        assert_eq!(reqs[0].key.as_deref(), Some("docs/new.md"));
        assert_eq!(reqs[0].header("x-amz-copy-source"), Some("docs%2Fold.md"));
        assert_eq!(reqs[1].method, Method::Delete);
        assert_eq!(reqs[1].key.as_deref(), Some("docs/old.md"));
    }

    #[tokio::test]
    async fn probe_reports_redirect_as_failure() {
        let transport = MockTransport::new(|_| {
            Ok(WriteResponse::new(302).with_header("location", "/login"))
        })
        .shared();
        let client = client_with(&transport);

        let summary = execute(&client, &config_in(""), Command::Probe)
            .await
            .unwrap();
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn upload_counts_unreadable_files() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("notes.txt");
        std::fs::write(&good, b"hello").unwrap();
        let missing = tmp.path().join("missing.txt");

        let transport = MockTransport::object_store().shared();
        let client = client_with(&transport);

        let summary = execute(
            &client,
            &config_in("inbox/"),
            Command::Upload {
                files: vec![good, missing],
            },
        )
        .await
        .unwrap();
        assert_eq!(
            summary,
            Summary {
                succeeded: 1,
                failed: 1
            }
        );

        let reqs = transport.requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].key.as_deref(), Some("inbox/notes.txt"));
        assert_eq!(reqs[0].header("content-type"), Some("text/plain"));
        assert_eq!(&reqs[0].body[..], b"hello");
    }
}
