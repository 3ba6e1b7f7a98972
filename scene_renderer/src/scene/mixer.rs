// scene/mixer.rs - Keyframe animation clips and a mixer that poses the model from them

use glam::{Quat, Vec3};
use super::model::Transform;

/// How values between two keyframes are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
}

/// Keyframe values of one animated node property
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

impl ChannelValues {
    fn len(&self) -> usize {
        match self {
            ChannelValues::Translation(v) | ChannelValues::Scale(v) => v.len(),
            ChannelValues::Rotation(v) => v.len(),
        }
    }

    /// Cubic-spline outputs come as (in-tangent, value, out-tangent)
    /// triplets; keep only the values.
    pub fn spline_keys(self) -> Self {
        fn middle<T: Copy>(values: Vec<T>) -> Vec<T> {
            values.chunks_exact(3).map(|triplet| triplet[1]).collect()
        }
        match self {
            ChannelValues::Translation(v) => ChannelValues::Translation(middle(v)),
            ChannelValues::Rotation(v) => ChannelValues::Rotation(middle(v)),
            ChannelValues::Scale(v) => ChannelValues::Scale(middle(v)),
        }
    }
}

/// One animated property of one node
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub node: usize,
    times: Vec<f32>,
    values: ChannelValues,
    interpolation: Interpolation,
}

impl Channel {
    pub fn new(node: usize, mut times: Vec<f32>, values: ChannelValues, interpolation: Interpolation) -> Self {
        times.truncate(values.len());
        Self { node, times, values, interpolation }
    }

    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Keyframe pair around `time` and the blend factor between them
    fn segment(&self, time: f32) -> Option<(usize, usize, f32)> {
        let count = self.times.len();
        if count == 0 {
            return None;
        }

        let next = self.times.partition_point(|&key| key <= time);
        if next == 0 {
            return Some((0, 0, 0.0));
        }
        if next >= count {
            return Some((count - 1, count - 1, 0.0));
        }

        let prev = next - 1;
        let span = self.times[next] - self.times[prev];
        let alpha = match self.interpolation {
            Interpolation::Step => 0.0,
            Interpolation::Linear if span > 0.0 => (time - self.times[prev]) / span,
            Interpolation::Linear => 0.0,
        };
        Some((prev, next, alpha))
    }

    /// Write this channel's value at `time` into `transform`
    pub fn apply(&self, time: f32, transform: &mut Transform) {
        let Some((a, b, alpha)) = self.segment(time) else {
            return;
        };
        match &self.values {
            ChannelValues::Translation(v) => transform.translation = v[a].lerp(v[b], alpha),
            ChannelValues::Rotation(v) => transform.rotation = v[a].slerp(v[b], alpha),
            ChannelValues::Scale(v) => transform.scale = v[a].lerp(v[b], alpha),
        }
    }
}

/// Named set of channels baked into the model file
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub channels: Vec<Channel>,
}

impl AnimationClip {
    /// Duration is the latest keyframe across all channels
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        let duration = channels.iter().map(Channel::end_time).fold(0.0, f32::max);
        Self { name: name.into(), duration, channels }
    }
}

/// Playback state of one clip inside the mixer
#[derive(Debug, Clone)]
pub struct ClipAction {
    clip: AnimationClip,
    /// Local playback position in seconds
    pub time: f32,
    pub paused: bool,
    pub time_scale: f32,
    playing: bool,
}

impl ClipAction {
    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.time = 0.0;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    fn advance(&mut self, dt: f32) {
        if self.paused || dt == 0.0 {
            return;
        }
        let duration = self.clip.duration;
        self.time += dt * self.time_scale;
        if duration > 0.0 {
            // looping playback
            self.time = self.time.rem_euclid(duration);
        }
    }
}

/// Handle to an action owned by an [`AnimationMixer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionId(usize);

/// Poses a model's nodes from its playing clip actions
pub struct AnimationMixer {
    rest_pose: Vec<Transform>,
    pose: Vec<Transform>,
    actions: Vec<ClipAction>,
}

impl AnimationMixer {
    pub fn new(rest_pose: Vec<Transform>) -> Self {
        Self {
            pose: rest_pose.clone(),
            rest_pose,
            actions: Vec::new(),
        }
    }

    /// Create an action for `clip`, initially stopped at time 0
    pub fn clip_action(&mut self, clip: AnimationClip) -> ActionId {
        self.actions.push(ClipAction {
            clip,
            time: 0.0,
            paused: false,
            time_scale: 1.0,
            playing: false,
        });
        ActionId(self.actions.len() - 1)
    }

    pub fn action(&self, id: ActionId) -> Option<&ClipAction> {
        self.actions.get(id.0)
    }

    pub fn action_mut(&mut self, id: ActionId) -> Option<&mut ClipAction> {
        self.actions.get_mut(id.0)
    }

    /// Advance unpaused actions by `dt` seconds and re-evaluate the pose.
    /// A zero `dt` leaves every action's time untouched.
    pub fn update(&mut self, dt: f32) {
        self.pose.clone_from(&self.rest_pose);
        for action in self.actions.iter_mut().filter(|a| a.playing) {
            action.advance(dt);
            for channel in &action.clip.channels {
                if let Some(transform) = self.pose.get_mut(channel.node) {
                    channel.apply(action.time, transform);
                }
            }
        }
    }

    pub fn pose(&self) -> &[Transform] {
        &self.pose
    }
}
