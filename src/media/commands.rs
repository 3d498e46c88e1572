use std::path::Path;

use crate::error::Result;
use crate::runner::{ProcessOutput, ProcessRunner};

/// Abstract media processing command representation
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy every stream
    pub fn copy_streams(self) -> Self {
        self.arg("-c").arg("copy")
    }

    /// Copy video stream
    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    /// Copy audio stream
    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    /// Add video filter
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Add filter graph
    pub fn filter_complex<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-filter_complex").arg(filter)
    }

    /// Select a stream for the output
    pub fn map<S: Into<String>>(self, stream: S) -> Self {
        self.arg("-map").arg(stream)
    }

    /// Execute the command through the process runner
    pub async fn execute(&self, runner: &dyn ProcessRunner) -> Result<ProcessOutput> {
        tracing::debug!("{}: {} {:?}", self.description, self.binary_path, self.args);
        runner.run(&self.binary_path, &self.args).await
    }
}

/// Builder for the ffmpeg invocations of the export pipeline
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Build stream-copy trim command between two timestamps
    pub fn trim<P: AsRef<Path>>(
        &self,
        video_path: P,
        output_path: P,
        start: f64,
        end: f64,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, format!("Trim video ({:.2}s to {:.2}s)", start, end))
            .overwrite()
            .input(video_path)
            .arg("-ss").arg(format!("{:.2}", start))
            .arg("-to").arg(format!("{:.2}", end))
            .copy_streams()
            .output(output_path)
    }

    /// Build subtitle burn-in command
    pub fn burn_subtitles<P: AsRef<Path>>(
        &self,
        video_path: P,
        subtitle_path: P,
        output_path: P,
        additional_options: &[String],
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Subtitle burn-in")
            .overwrite()
            .input(&video_path)
            .video_filter(format!("subtitles={}", escape_filter_path(subtitle_path.as_ref())))
            .video_codec("libx264")
            .copy_audio()
            // User-specified encoding options go right before the output
            .args(additional_options.iter().cloned())
            .output(output_path)
    }

    /// Build command replacing the audio track of a video with a boosted soundtrack
    pub fn replace_audio<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        output_path: P,
        volume_gain: f64,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio replacement")
            .overwrite()
            .input(video_path)
            .input(audio_path)
            .filter_complex(format!("[1:a]volume={:.1}[a_boosted]", volume_gain))
            .map("0:v")
            .map("[a_boosted]")
            .copy_video()
            .audio_codec("aac")
            .arg("-shortest")
            .output(output_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check")
            .arg("-version")
    }
}

/// Escape a path for use inside an ffmpeg filter argument.
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_bounds_use_two_decimals() {
        let cmd = MediaCommandBuilder::new("ffmpeg").trim("in.mp4", "out.mp4", 2.0, 5.0);

        assert_eq!(
            cmd.args,
            vec!["-y", "-i", "in.mp4", "-ss", "2.00", "-to", "5.00", "-c", "copy", "out.mp4"]
        );
    }

    #[test]
    fn test_burn_subtitles_reencodes_video_only() {
        let options = vec!["-preset".to_string(), "fast".to_string()];
        let cmd = MediaCommandBuilder::new("ffmpeg").burn_subtitles(
            "in.mp4",
            "output/srt/clip.srt",
            "out.mp4",
            &options,
        );

        assert_eq!(
            cmd.args,
            vec![
                "-y", "-i", "in.mp4", "-vf", "subtitles=output/srt/clip.srt",
                "-c:v", "libx264", "-c:a", "copy", "-preset", "fast", "out.mp4",
            ]
        );
    }

    #[test]
    fn test_replace_audio_maps_streams() {
        let cmd = MediaCommandBuilder::new("ffmpeg").replace_audio("v.mp4", "mix.wav", "final.mp4", 9.0);

        assert_eq!(
            cmd.args,
            vec![
                "-y", "-i", "v.mp4", "-i", "mix.wav",
                "-filter_complex", "[1:a]volume=9.0[a_boosted]",
                "-map", "0:v", "-map", "[a_boosted]",
                "-c:v", "copy", "-c:a", "aac", "-shortest", "final.mp4",
            ]
        );
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(escape_filter_path(Path::new("C:\\subs\\it's.srt")), "C\\:/subs/it\\'s.srt");
    }
}
