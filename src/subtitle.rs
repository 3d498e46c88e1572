use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::artifact::{Artifact, ArtifactKind};
use crate::error::Result;
use crate::models::Segment;

/// Render segments as SRT, numbering entries from 1 in the given order.
pub fn render_srt(segments: &[Segment]) -> String {
    let mut srt_content = String::new();

    for (index, segment) in segments.iter().enumerate() {
        let start_time = format_srt_time(segment.start);
        let end_time = format_srt_time(segment.end);

        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            start_time,
            end_time,
            segment.text.trim()
        ));
    }

    srt_content
}

/// Generate SRT subtitle file from segments, replacing any previous file
pub async fn generate_srt<P: AsRef<Path>>(
    segments: &[Segment],
    output_path: P,
) -> Result<Artifact> {
    let output_path = output_path.as_ref();
    info!("Generating SRT file: {}", output_path.display());

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(output_path, render_srt(segments)).await?;

    info!("SRT file generated with {} entries", segments.len());
    Artifact::produced(output_path, ArtifactKind::Subtitles).await
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm)
pub fn format_srt_time(seconds: f64) -> String {
    let total_milliseconds = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}
