//! Single entry point for control events
//!
//! Every UI or remote control event is a `ControlCommand`, dispatched by
//! kind onto the engine. Commands can also be parsed from short text lines
//! (`vol 1 0.5`, `solo 2`, `tab waveform`) for consoles and scripting.

use std::str::FromStr;

use thiserror::Error;

use crate::dsp::EqBand;
use crate::graph::SendEffect;
use crate::types::TrackId;

use super::analysis::AnalysisView;
use super::engine::MixEngine;
use super::error::EngineResult;
use super::params::ControlSource;
use super::track::{TrackConfig, TrackKind};

#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    AddTrack(TrackConfig),
    RemoveTrack(TrackId),
    RenameTrack { id: TrackId, name: String },
    SetVolume { id: TrackId, value: f32 },
    SetPan { id: TrackId, value: f32 },
    SetEq { id: TrackId, band: EqBand, value: f32 },
    SetEffect { id: TrackId, effect: SendEffect, value: f32 },
    SetMasterGain(f32),
    ToggleSolo(TrackId),
    ToggleMute(TrackId),
    Play,
    Pause,
    Stop,
    SelectAnalysisTab(AnalysisView),
}

/// What a dispatched command did
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Applied,
    TrackAdded(TrackId),
    /// `None` when the track did not exist
    TrackRemoved(Option<TrackId>),
    Solo { id: TrackId, on: bool },
    Mute { id: TrackId, on: bool },
    ViewSelected { view: AnalysisView, changed: bool },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}'")]
    Unknown(String),

    #[error("{command}: missing {what}")]
    Missing {
        command: &'static str,
        what: &'static str,
    },

    #[error("{command}: invalid {what} '{value}'")]
    Invalid {
        command: &'static str,
        what: &'static str,
        value: String,
    },
}

struct Args<'a> {
    command: &'static str,
    words: std::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn next(&mut self, what: &'static str) -> Result<&'a str, ParseError> {
        self.words.next().ok_or(ParseError::Missing {
            command: self.command,
            what,
        })
    }

    fn parse<T: FromStr>(&mut self, what: &'static str) -> Result<T, ParseError> {
        let word = self.next(what)?;
        word.parse().map_err(|_| ParseError::Invalid {
            command: self.command,
            what,
            value: word.to_string(),
        })
    }

    fn id(&mut self) -> Result<TrackId, ParseError> {
        self.parse::<u32>("track id").map(TrackId)
    }

    fn rest(&mut self) -> String {
        self.words.by_ref().collect::<Vec<_>>().join(" ")
    }
}

impl ControlCommand {
    /// Parse a console line
    ///
    /// ```text
    /// add [name] [audio|instrument|drums|vocals]
    /// rm <id>            rename <id> <name>
    /// vol <id> <0..1>    pan <id> <-1..1>
    /// eq <id> <high|mid|low> <dB>
    /// fx <id> <reverb|delay> <%>
    /// solo <id>          mute <id>
    /// master <0..1>
    /// play | pause | stop
    /// tab <spectrum|waveform|histogram>
    /// ```
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(ParseError::Empty);
        };
        let head = head.to_ascii_lowercase();
        let args = |command: &'static str| Args { command, words: words.clone() };

        let cmd = match head.as_str() {
            "add" => {
                let mut a = args("add");
                let mut parts: Vec<&str> = a.words.by_ref().collect();
                let kind = match parts.last().map(|w| parse_kind(w)) {
                    Some(Some(kind)) => {
                        parts.pop();
                        Some(kind)
                    }
                    _ => None,
                };
                ControlCommand::AddTrack(TrackConfig {
                    name: (!parts.is_empty()).then(|| parts.join(" ")),
                    kind,
                    ..Default::default()
                })
            }
            "rm" | "remove" => ControlCommand::RemoveTrack(args("remove").id()?),
            "rename" => {
                let mut a = args("rename");
                let id = a.id()?;
                let name = a.rest();
                if name.is_empty() {
                    return Err(ParseError::Missing { command: "rename", what: "name" });
                }
                ControlCommand::RenameTrack { id, name }
            }
            "vol" | "volume" => {
                let mut a = args("volume");
                ControlCommand::SetVolume { id: a.id()?, value: a.parse("value")? }
            }
            "pan" => {
                let mut a = args("pan");
                ControlCommand::SetPan { id: a.id()?, value: a.parse("value")? }
            }
            "eq" => {
                let mut a = args("eq");
                ControlCommand::SetEq { id: a.id()?, band: a.parse("band")?, value: a.parse("dB")? }
            }
            "fx" | "send" => {
                let mut a = args("fx");
                ControlCommand::SetEffect {
                    id: a.id()?,
                    effect: a.parse("effect")?,
                    value: a.parse("percent")?,
                }
            }
            "master" => ControlCommand::SetMasterGain(args("master").parse("value")?),
            "solo" => ControlCommand::ToggleSolo(args("solo").id()?),
            "mute" => ControlCommand::ToggleMute(args("mute").id()?),
            "play" => ControlCommand::Play,
            "pause" => ControlCommand::Pause,
            "stop" => ControlCommand::Stop,
            "tab" | "view" => ControlCommand::SelectAnalysisTab(args("tab").parse("view")?),
            _ => return Err(ParseError::Unknown(head)),
        };
        Ok(cmd)
    }
}

impl FromStr for ControlCommand {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_kind(word: &str) -> Option<TrackKind> {
    match word.to_ascii_lowercase().as_str() {
        "audio" => Some(TrackKind::Audio),
        "instrument" | "inst" => Some(TrackKind::Instrument),
        "drums" => Some(TrackKind::Drums),
        "vocals" | "vox" => Some(TrackKind::Vocals),
        _ => None,
    }
}

impl MixEngine {
    /// Route a control event to the controller that owns it
    pub fn dispatch(&mut self, cmd: ControlCommand, source: ControlSource) -> EngineResult<CommandOutcome> {
        log::debug!("Dispatch {:?} ({:?})", cmd, source);
        let outcome = match cmd {
            ControlCommand::AddTrack(config) => CommandOutcome::TrackAdded(self.add_track(config)?),
            ControlCommand::RemoveTrack(id) => {
                CommandOutcome::TrackRemoved(self.remove_track(id).map(|t| t.id))
            }
            ControlCommand::RenameTrack { id, name } => {
                self.rename_track(id, name)?;
                CommandOutcome::Applied
            }
            ControlCommand::SetVolume { id, value } => {
                self.set_volume(id, value, source)?;
                CommandOutcome::Applied
            }
            ControlCommand::SetPan { id, value } => {
                self.set_pan(id, value, source)?;
                CommandOutcome::Applied
            }
            ControlCommand::SetEq { id, band, value } => {
                self.set_eq(id, band, value, source)?;
                CommandOutcome::Applied
            }
            ControlCommand::SetEffect { id, effect, value } => {
                self.set_effect(id, effect, value, source)?;
                CommandOutcome::Applied
            }
            ControlCommand::SetMasterGain(value) => {
                self.set_master_gain(value, source)?;
                CommandOutcome::Applied
            }
            ControlCommand::ToggleSolo(id) => CommandOutcome::Solo { id, on: self.toggle_solo(id)? },
            ControlCommand::ToggleMute(id) => CommandOutcome::Mute { id, on: self.toggle_mute(id)? },
            ControlCommand::Play => {
                self.play()?;
                CommandOutcome::Applied
            }
            ControlCommand::Pause => {
                self.pause();
                CommandOutcome::Applied
            }
            ControlCommand::Stop => {
                self.stop();
                CommandOutcome::Applied
            }
            ControlCommand::SelectAnalysisTab(view) => CommandOutcome::ViewSelected {
                view,
                changed: self.select_analysis_tab(view),
            },
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_parameter_commands() {
        assert_eq!(
            ControlCommand::parse("vol 1 0.5"),
            Ok(ControlCommand::SetVolume { id: TrackId(1), value: 0.5 })
        );
        assert_eq!(
            ControlCommand::parse("EQ 2 low -6"),
            Ok(ControlCommand::SetEq { id: TrackId(2), band: EqBand::Low, value: -6.0 })
        );
        assert_eq!(
            ControlCommand::parse("fx 3 delay 40"),
            Ok(ControlCommand::SetEffect { id: TrackId(3), effect: SendEffect::Delay, value: 40.0 })
        );
        assert_eq!(
            "tab histogram".parse::<ControlCommand>(),
            Ok(ControlCommand::SelectAnalysisTab(AnalysisView::Histogram))
        );
    }

    #[test]
    fn test_parse_add() {
        assert_eq!(
            ControlCommand::parse("add"),
            Ok(ControlCommand::AddTrack(TrackConfig::default()))
        );
        assert_eq!(
            ControlCommand::parse("add Lead Guitar instrument"),
            Ok(ControlCommand::AddTrack(TrackConfig::named("Lead Guitar", TrackKind::Instrument)))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(ControlCommand::parse("   "), Err(ParseError::Empty));
        assert_eq!(ControlCommand::parse("jump"), Err(ParseError::Unknown("jump".into())));
        assert_eq!(
            ControlCommand::parse("pan 1"),
            Err(ParseError::Missing { command: "pan", what: "value" })
        );
        assert!(matches!(
            ControlCommand::parse("solo x"),
            Err(ParseError::Invalid { what: "track id", .. })
        ));
    }
}
