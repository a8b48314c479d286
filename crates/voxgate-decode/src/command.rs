use voxgate_core::sniff::AudioFormat;

/// Decoder command selection. Production defaults run `opusdec` for
/// Opus and `ffmpeg` for WebM/3GP, both targeting 16kHz mono s16le
/// PCM on stdout, wrapped in a firejail sandbox. Every command line
/// is overridable so tests can substitute plain shell utilities.
#[derive(Clone, Debug)]
pub struct DecodeConfig {
    /// Command for Opus input (stdin → PCM on stdout).
    pub opus_command: Vec<String>,
    /// Command for WebM/3GP input, same stdio contract.
    pub transcode_command: Vec<String>,
    /// Sandbox wrapper prepended to the decoder argv.
    pub jail_command: Vec<String>,
    /// Run the decoder without the sandbox wrapper.
    pub disable_jail: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            opus_command: str_vec(&["opusdec", "--rate", "16000", "-", "-"]),
            transcode_command: str_vec(&[
                "ffmpeg", "-i", "pipe:0", "-f", "s16le", "-acodec", "pcm_s16le", "-ar",
                "16000", "-ac", "1", "pipe:1",
            ]),
            jail_command: str_vec(&["firejail", "--profile=opusdec.profile", "--debug", "--force"]),
            disable_jail: false,
        }
    }
}

impl DecodeConfig {
    /// Unjailed config with both decoder commands replaced, for tests.
    pub fn with_command(argv: &[&str]) -> Self {
        Self {
            opus_command: str_vec(argv),
            transcode_command: str_vec(argv),
            jail_command: Vec::new(),
            disable_jail: true,
        }
    }

    /// Full argv for decoding `format`, jail wrapper included unless
    /// disabled. `None` for an unrecognized format; the sniffer
    /// rejects those before a job is ever built.
    pub fn argv(&self, format: AudioFormat) -> Option<Vec<String>> {
        let decoder = match format {
            AudioFormat::Opus => &self.opus_command,
            AudioFormat::Webm | AudioFormat::ThreeGp => &self.transcode_command,
            AudioFormat::Unknown => return None,
        };
        if self.disable_jail {
            Some(decoder.clone())
        } else {
            let mut argv = self.jail_command.clone();
            argv.extend(decoder.iter().cloned());
            Some(argv)
        }
    }
}

fn str_vec(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_string()).collect()
}
