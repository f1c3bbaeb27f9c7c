//! Animation bookkeeping.
//!
//! The controller does not play skeletal animation itself. It needs clip
//! durations to drive animation-timed transitions, and it tells the rendering
//! layer which clip to cross-fade to. [`Animator`] keeps the current base clip,
//! per-clip effective weights and a queue of [`CrossFade`] commands the renderer
//! drains each frame. The queue holds at most [`MAX_PENDING_CROSS_FADES`]
//! entries; older fades are dropped when nobody drains it.

use std::collections::HashMap;

use bevy::prelude::*;

/// Upper bound on undrained cross-fade commands per animator.
pub const MAX_PENDING_CROSS_FADES: usize = 8;

/// Clips the locomotion states request.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clip {
    Idle,
    RotateLeft,
    RotateRight,
    Run,
    Sprint,
    StartForward,
    StartLeft,
    StartRight,
    StartBackLeft,
    StartBackRight,
    Stop,
    JumpIdle,
    JumpRunning,
    Falling,
    DropIdle,
    DropRunning,
    DropRunningRoll,
}

impl Clip {
    /// Clip name looked up in the loaded model unless overridden.
    pub fn default_name(self) -> &'static str {
        match self {
            Clip::Idle => "idle",
            Clip::RotateLeft => "rotate_left",
            Clip::RotateRight => "rotate_right",
            Clip::Run => "run",
            Clip::Sprint => "sprint",
            Clip::StartForward => "start_forward",
            Clip::StartLeft => "start_left",
            Clip::StartRight => "start_right",
            Clip::StartBackLeft => "start_back_left",
            // Shares the back-left clip. Override with `Animator::set_clip_name`
            // for models that ship a mirrored one.
            Clip::StartBackRight => "start_back_left",
            Clip::Stop => "stop",
            Clip::JumpIdle => "jump_idle",
            Clip::JumpRunning => "jump_running",
            Clip::Falling => "falling",
            Clip::DropIdle => "drop_idle",
            Clip::DropRunning => "drop_running",
            Clip::DropRunningRoll => "drop_running_roll",
        }
    }
}

/// Clip name to duration (seconds) for a loaded model.
#[derive(Debug, Clone, Default)]
pub struct AnimationLibrary {
    clips: HashMap<String, f32>,
}

impl AnimationLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a clip.
    pub fn with_clip(mut self, name: impl Into<String>, duration: f32) -> Self {
        self.insert(name, duration);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, duration: f32) {
        self.clips.insert(name.into(), duration);
    }

    pub fn duration(&self, name: &str) -> Option<f32> {
        self.clips.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.clips.keys().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<(S, f32)> for AnimationLibrary {
    fn from_iter<I: IntoIterator<Item = (S, f32)>>(iter: I) -> Self {
        let mut library = Self::new();
        for (name, duration) in iter {
            library.insert(name, duration);
        }
        library
    }
}

/// Request for the renderer to blend from one clip to another.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossFade {
    pub from: String,
    pub to: String,
    /// Blend duration in seconds.
    pub duration: f32,
}

#[derive(Debug, Clone)]
struct ActiveFade {
    to: String,
    duration: f32,
    elapsed: f32,
    start_weights: HashMap<String, f32>,
}

/// Per-character animation state.
#[derive(Debug, Clone)]
pub struct Animator {
    library: AnimationLibrary,
    overrides: HashMap<Clip, String>,
    current: String,
    weights: HashMap<String, f32>,
    fade: Option<ActiveFade>,
    commands: Vec<CrossFade>,
    missing_clip_duration: f32,
}

impl Animator {
    /// Create an animator with no model loaded.
    pub fn new(missing_clip_duration: f32) -> Self {
        Self {
            library: AnimationLibrary::default(),
            overrides: HashMap::new(),
            current: Clip::Idle.default_name().to_owned(),
            weights: HashMap::new(),
            fade: None,
            commands: Vec::new(),
            missing_clip_duration,
        }
    }

    /// Load the clips of a model. The idle clip starts fully weighted.
    pub fn set_library(&mut self, library: AnimationLibrary) {
        let idle = Clip::Idle.default_name();
        self.weights = library
            .names()
            .map(|name| {
                let weight = if name.eq_ignore_ascii_case(idle) { 1.0 } else { 0.0 };
                (name.to_owned(), weight)
            })
            .collect();
        self.library = library;
        self.current = idle.to_owned();
        self.fade = None;
        self.commands.clear();
    }

    pub fn library(&self) -> &AnimationLibrary {
        &self.library
    }

    /// Whether a model with clips is loaded.
    pub fn has_model(&self) -> bool {
        !self.library.is_empty()
    }

    /// Replace the clip name used for `clip`.
    pub fn set_clip_name(&mut self, clip: Clip, name: impl Into<String>) {
        self.overrides.insert(clip, name.into());
    }

    /// Name that will be requested for `clip`.
    pub fn clip_name(&self, clip: Clip) -> &str {
        self.overrides
            .get(&clip)
            .map(String::as_str)
            .unwrap_or_else(|| clip.default_name())
    }

    /// Name of the clip currently playing as base action.
    pub fn current_clip(&self) -> &str {
        &self.current
    }

    /// Switch to `clip`, cross-fading over `fade_in` seconds.
    ///
    /// Returns the clip duration. Clips missing from the model report the
    /// configured fallback duration.
    pub fn set_animation(&mut self, clip: Clip, fade_in: f32) -> f32 {
        let name = self.clip_name(clip).to_owned();

        if self.library.contains(&self.current)
            && self.library.contains(&name)
            && self.current != name
        {
            self.start_fade(name.clone(), fade_in);
        }

        match self.library.duration(&name) {
            Some(duration) => duration,
            None => {
                if self.has_model() {
                    warn!(
                        "Animation clip '{}' not found, assuming {}s",
                        name, self.missing_clip_duration
                    );
                } else {
                    debug!("No animation model loaded, clip '{}' skipped", name);
                }
                self.missing_clip_duration
            }
        }
    }

    fn start_fade(&mut self, to: String, duration: f32) {
        if self.commands.len() >= MAX_PENDING_CROSS_FADES {
            self.commands.remove(0);
        }
        self.commands.push(CrossFade {
            from: self.current.clone(),
            to: to.clone(),
            duration,
        });

        let mut start_weights = self.weights.clone();
        start_weights.entry(to.clone()).or_insert(0.0);
        self.fade = Some(ActiveFade {
            to: to.clone(),
            duration,
            elapsed: 0.0,
            start_weights,
        });
        self.current = to;
    }

    /// Advance active cross-fades.
    pub fn advance(&mut self, delta: f32) {
        let Some(fade) = self.fade.as_mut() else {
            return;
        };

        fade.elapsed += delta;
        let t = if fade.duration > 0.0 {
            (fade.elapsed / fade.duration).min(1.0)
        } else {
            1.0
        };

        for (name, start) in &fade.start_weights {
            let end = if *name == fade.to { 1.0 } else { 0.0 };
            self.weights.insert(name.clone(), start + (end - start) * t);
        }

        if t >= 1.0 {
            self.fade = None;
        }
    }

    /// Effective weight of a clip (0.0 for unknown clips).
    pub fn weight(&self, name: &str) -> f32 {
        self.weights.get(name).copied().unwrap_or(0.0)
    }

    /// Override the effective weight of a clip.
    pub fn set_weight(&mut self, name: &str, weight: f32) {
        self.weights.insert(name.to_owned(), weight);
    }

    /// Cross-fade commands queued since the last drain.
    pub fn pending_cross_fades(&self) -> &[CrossFade] {
        &self.commands
    }

    /// Take the queued cross-fade commands.
    pub fn drain_cross_fades(&mut self) -> Vec<CrossFade> {
        std::mem::take(&mut self.commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxman() -> AnimationLibrary {
        [("idle", 2.0), ("run", 0.7), ("stop", 0.5), ("start_back_left", 0.6)]
            .into_iter()
            .collect()
    }

    #[test]
    fn missing_clip_uses_fallback_duration() {
        let mut animator = Animator::new(0.1);
        animator.set_library(boxman());
        assert_eq!(animator.set_animation(Clip::Sprint, 0.3), 0.1);
        assert!(animator.pending_cross_fades().is_empty());
    }

    #[test]
    fn no_model_reports_fallback() {
        let mut animator = Animator::new(0.1);
        assert!(!animator.has_model());
        assert_eq!(animator.set_animation(Clip::Run, 0.1), 0.1);
    }

    #[test]
    fn switching_clips_queues_cross_fade() {
        let mut animator = Animator::new(0.1);
        animator.set_library(boxman());

        let duration = animator.set_animation(Clip::Run, 0.1);
        assert_eq!(duration, 0.7);
        assert_eq!(animator.current_clip(), "run");
        assert_eq!(
            animator.drain_cross_fades(),
            vec![CrossFade {
                from: "idle".into(),
                to: "run".into(),
                duration: 0.1
            }]
        );
        assert!(animator.pending_cross_fades().is_empty());
    }

    #[test]
    fn same_clip_does_not_fade() {
        let mut animator = Animator::new(0.1);
        animator.set_library(boxman());
        animator.set_animation(Clip::Idle, 0.3);
        assert!(animator.pending_cross_fades().is_empty());
    }

    #[test]
    fn undrained_queue_keeps_latest_fades() {
        let mut animator = Animator::new(0.1);
        animator.set_library(boxman());

        for _ in 0..50 {
            animator.set_animation(Clip::Run, 0.1);
            animator.set_animation(Clip::Idle, 0.1);
        }

        let pending = animator.pending_cross_fades();
        assert_eq!(pending.len(), MAX_PENDING_CROSS_FADES);
        assert_eq!(pending.last().map(|f| f.to.as_str()), Some("idle"));
        assert_eq!(animator.current_clip(), "idle");
    }

    #[test]
    fn fade_moves_weights() {
        let mut animator = Animator::new(0.1);
        animator.set_library(boxman());
        assert_eq!(animator.weight("idle"), 1.0);

        animator.set_animation(Clip::Stop, 0.2);
        animator.advance(0.1);
        assert!((animator.weight("idle") - 0.5).abs() < 1e-5);
        assert!((animator.weight("stop") - 0.5).abs() < 1e-5);

        animator.advance(0.5);
        assert_eq!(animator.weight("idle"), 0.0);
        assert_eq!(animator.weight("stop"), 1.0);
    }

    #[test]
    fn back_right_shares_back_left_clip() {
        let mut animator = Animator::new(0.1);
        animator.set_library(boxman());
        assert_eq!(animator.clip_name(Clip::StartBackRight), "start_back_left");
        assert_eq!(animator.set_animation(Clip::StartBackRight, 0.1), 0.6);
    }

    #[test]
    fn clip_names_can_be_overridden() {
        let mut animator = Animator::new(0.1);
        animator.set_library(boxman().with_clip("start_back_right", 0.65));
        animator.set_clip_name(Clip::StartBackRight, "start_back_right");

        assert_eq!(animator.set_animation(Clip::StartBackRight, 0.1), 0.65);
        assert_eq!(animator.current_clip(), "start_back_right");
    }
}
