use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppMode {
    #[default]
    Config,
    Edit,
    Monitor,
}

impl fmt::Display for AppMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AppMode::Config => "config",
            AppMode::Edit => "edit",
            AppMode::Monitor => "monitor",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefusalReason {
    AlreadyEditing,
    NoReferenceFrame,
}

/// Resultado de pedir un cambio de modo. Un rechazo no es un error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transition {
    Entered { mode: AppMode },
    Refused { mode: AppMode, reason: RefusalReason },
}

/// Modo activo (exactamente uno) y panel lateral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeController {
    mode: AppMode,
    sidebar_open: bool,
}

impl Default for ModeController {
    fn default() -> Self {
        Self { mode: AppMode::Config, sidebar_open: true }
    }
}

impl ModeController {
    pub fn mode(&self) -> AppMode {
        self.mode
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn toggle_sidebar(&mut self) -> bool {
        self.sidebar_open = !self.sidebar_open;
        self.sidebar_open
    }

    /// Aplica la regla de transición. Entrar en `edit` exige venir de otro modo
    /// y tener un frame de referencia; el resto de cambios es incondicional.
    pub fn request(&mut self, target: AppMode, has_reference: bool) -> Transition {
        if target == AppMode::Edit {
            if self.mode == AppMode::Edit {
                return Transition::Refused { mode: self.mode, reason: RefusalReason::AlreadyEditing };
            }
            if !has_reference {
                return Transition::Refused { mode: self.mode, reason: RefusalReason::NoReferenceFrame };
            }
        }
        self.mode = target;
        Transition::Entered { mode: target }
    }
}
