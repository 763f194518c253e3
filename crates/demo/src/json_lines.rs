//! JSON-lines telemetry writer.
//!
//! Events reach the writer through a [`ChannelSink`], so emitting never waits on
//! the output. A background task serializes and writes each event; write errors
//! are logged and the task keeps draining.

use sift_search::{ChannelSink, TelemetryEvent};
use sift_worker::TaskClass;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Spawns the writer task. It finishes, returning `writer`, once every sink clone is dropped.
pub fn spawn<W>(writer: W) -> (ChannelSink, JoinHandle<W>)
where
	W: AsyncWrite + Unpin + Send + 'static,
{
	let (sink, rx) = ChannelSink::new();
	let task = sift_worker::spawn(TaskClass::Background, drain(rx, writer));
	(sink, task)
}

async fn drain<W>(mut rx: mpsc::UnboundedReceiver<TelemetryEvent>, mut writer: W) -> W
where
	W: AsyncWrite + Unpin,
{
	while let Some(event) = rx.recv().await {
		let Ok(mut line) = event.to_json() else {
			continue;
		};
		line.push('\n');
		if let Err(error) = write_line(&mut writer, &line).await {
			tracing::trace!(event = event.kind.as_str(), %error, "telemetry json write failed");
		}
	}
	writer
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> std::io::Result<()> {
	writer.write_all(line.as_bytes()).await?;
	writer.flush().await
}
