//! Speech renderers: an external text-to-speech command, or silence.

use log::debug;
use parking_lot::Mutex;
use persona_talk_config::SpeechConfig;
use persona_talk_protocol::{
    EventMsg, EventPayload, EventSink, SpeechRenderer, UtteranceHandle, UtteranceId,
};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

/// Build the renderer described by `config`.
pub fn renderer_from_config(
    config: &SpeechConfig,
    event_sink: Option<Arc<dyn EventSink>>,
) -> Arc<dyn SpeechRenderer> {
    match config.command.as_deref().filter(|command| !command.trim().is_empty()) {
        Some(command) => Arc::new(
            CommandSpeechRenderer::new(command, config.args.clone(), event_sink)
                .with_voice(config.language.clone(), config.rate),
        ),
        None => Arc::new(SilentSpeechRenderer),
    }
}

/// Renderer that never produces sound.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSpeechRenderer;

impl SpeechRenderer for SilentSpeechRenderer {
    fn speak(&self, text: &str) -> UtteranceHandle {
        let handle = UtteranceHandle::new();
        debug!(
            "speech disabled, skipping utterance (utterance_id={}, text_len={})",
            handle.id(),
            text.len()
        );
        handle
    }

    fn cancel_all(&self) {}

    fn is_speaking(&self) -> bool {
        false
    }
}

/// Shared between the renderer and its playback tasks.
struct Playback {
    active: Mutex<Option<UtteranceHandle>>,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl Playback {
    fn emit(&self, payload: EventPayload) {
        if let Some(sink) = &self.event_sink {
            sink.emit(EventMsg::new(None, payload));
        }
    }

    /// Clear the active slot if it still belongs to `id`.
    fn finish(&self, id: UtteranceId) {
        let mut active = self.active.lock();
        if active.as_ref().map(UtteranceHandle::id) == Some(id) {
            active.take();
        }
    }
}

/// Runs an external program once per utterance with the text as last argument.
///
/// `{language}` and `{rate}` inside configured arguments are substituted.
/// Starting an utterance kills the one in progress. Spawn and exit failures are
/// logged and otherwise ignored.
pub struct CommandSpeechRenderer {
    program: String,
    args: Vec<String>,
    language: String,
    rate: f32,
    playback: Arc<Playback>,
}

impl CommandSpeechRenderer {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        event_sink: Option<Arc<dyn EventSink>>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            language: "ja-JP".to_string(),
            rate: 1.0,
            playback: Arc::new(Playback {
                active: Mutex::new(None),
                event_sink,
            }),
        }
    }

    /// Set the values substituted for `{language}` and `{rate}`.
    pub fn with_voice(mut self, language: impl Into<String>, rate: f32) -> Self {
        self.language = language.into();
        self.rate = rate;
        self
    }

    fn command_args(&self, text: &str) -> Vec<String> {
        let rate = self.rate.to_string();
        let mut args = self
            .args
            .iter()
            .map(|arg| {
                arg.replace("{language}", &self.language)
                    .replace("{rate}", &rate)
            })
            .collect::<Vec<_>>();
        args.push(text.to_string());
        args
    }
}

impl SpeechRenderer for CommandSpeechRenderer {
    fn speak(&self, text: &str) -> UtteranceHandle {
        let handle = UtteranceHandle::new();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime for speech (utterance_id={})", handle.id());
            return handle;
        };

        if let Some(previous) = self.playback.active.lock().replace(handle.clone()) {
            previous.cancel();
        }

        let mut command = Command::new(&self.program);
        command
            .args(self.command_args(text))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        let playback = self.playback.clone();
        let utterance = handle.clone();
        let program = self.program.clone();
        runtime.spawn(async move {
            let id = utterance.id();
            let mut child = match command.spawn() {
                Ok(child) => child,
                Err(err) => {
                    debug!("speech command failed to start (program={program}): {err}");
                    playback.finish(id);
                    playback.emit(EventPayload::SpeechFinished { utterance_id: id });
                    return;
                }
            };
            playback.emit(EventPayload::SpeechStarted { utterance_id: id });
            tokio::select! {
                status = child.wait() => {
                    if let Err(err) = &status {
                        debug!("speech command wait failed (utterance_id={id}): {err}");
                    }
                    playback.finish(id);
                    playback.emit(EventPayload::SpeechFinished { utterance_id: id });
                }
                _ = utterance.cancelled() => {
                    let _ = child.kill().await;
                    playback.finish(id);
                    playback.emit(EventPayload::SpeechCancelled { utterance_id: id });
                }
            }
        });
        handle
    }

    fn cancel_all(&self) {
        if let Some(active) = self.playback.active.lock().take() {
            active.cancel();
        }
    }

    fn is_speaking(&self) -> bool {
        self.playback.active.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandSpeechRenderer, SilentSpeechRenderer, renderer_from_config};
    use persona_talk_config::SpeechConfig;
    use persona_talk_protocol::SpeechRenderer;
    use pretty_assertions::assert_eq;

    #[test]
    fn substitutes_voice_placeholders() {
        let renderer = CommandSpeechRenderer::new(
            "say",
            vec!["--lang={language}".to_string(), "-r".to_string(), "{rate}".to_string()],
            None,
        )
        .with_voice("en-US", 1.5);
        assert_eq!(
            renderer.command_args("hello"),
            vec!["--lang=en-US", "-r", "1.5", "hello"]
        );
    }

    #[test]
    fn silent_renderer_never_speaks() {
        let renderer = SilentSpeechRenderer;
        renderer.speak("hi");
        assert!(!renderer.is_speaking());
    }

    #[test]
    fn config_without_command_is_silent() {
        let renderer = renderer_from_config(&SpeechConfig::default(), None);
        renderer.speak("hi");
        assert!(!renderer.is_speaking());
    }
}
