// animation/timeline.rs - Paused, externally scrubbed keyframe timeline

use super::Easing;

/// One property change on the timeline's time axis.
#[derive(Debug, Clone)]
pub struct Track<K> {
    pub key: K,
    pub from: f32,
    pub to: f32,
    /// Absolute start position on the timeline, in timeline seconds
    pub start: f32,
    pub duration: f32,
    pub easing: Easing,
}

impl<K> Track<K> {
    pub fn end(&self) -> f32 {
        self.start + self.duration
    }

    /// Value of this track when the timeline sits at `time`
    pub fn value_at(&self, time: f32) -> f32 {
        let local = if self.duration <= 0.0 {
            if time >= self.start { 1.0 } else { 0.0 }
        } else {
            ((time - self.start) / self.duration).clamp(0.0, 1.0)
        };
        self.from + (self.to - self.from) * self.easing.apply(local)
    }
}

/// Ordered collection of tracks exposing a single scrubbable progress.
///
/// The timeline never advances on its own clock: callers position it with
/// [`Timeline::seek_progress`] and read the resulting values back.
#[derive(Debug, Clone)]
pub struct Timeline<K> {
    tracks: Vec<Track<K>>,
    time: f32,
}

impl<K: Copy> Timeline<K> {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            time: 0.0,
        }
    }

    /// Append a tween of `key` from `from` to `to`, starting at `position`
    pub fn to(
        &mut self,
        key: K,
        from: f32,
        to: f32,
        duration: f32,
        position: f32,
        easing: Easing,
    ) -> &mut Self {
        self.tracks.push(Track {
            key,
            from,
            to,
            start: position.max(0.0),
            duration: duration.max(0.0),
            easing,
        });
        self
    }

    /// Total length: the latest track end
    pub fn duration(&self) -> f32 {
        self.tracks.iter().map(Track::end).fold(0.0, f32::max)
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn progress(&self) -> f32 {
        let duration = self.duration();
        if duration <= 0.0 {
            return 0.0;
        }
        self.time / duration
    }

    /// Move the playhead to `progress` (clamped to [0, 1]).
    /// Returns true when the playhead actually moved.
    pub fn seek_progress(&mut self, progress: f32) -> bool {
        let time = progress.clamp(0.0, 1.0) * self.duration();
        let moved = time != self.time;
        self.time = time;
        moved
    }

    /// Current value of every track, in insertion order
    pub fn values(&self) -> impl Iterator<Item = (K, f32)> + '_ {
        self.tracks.iter().map(move |track| (track.key, track.value_at(self.time)))
    }

    pub fn tracks(&self) -> &[Track<K>] {
        &self.tracks
    }
}

impl<K: Copy> Default for Timeline<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Prop {
        Progress,
        Spin,
        Depth,
    }

    fn sample_timeline() -> Timeline<Prop> {
        let mut timeline = Timeline::new();
        timeline
            .to(Prop::Progress, 0.0, 0.5, 2.5, 0.0, Easing::Linear)
            .to(Prop::Spin, 0.0, 10.0, 5.0, 0.0, Easing::Linear)
            .to(Prop::Depth, 0.0, -50.0, 4.0, 1.0, Easing::Linear);
        timeline
    }

    fn value(timeline: &Timeline<Prop>, key: Prop) -> f32 {
        timeline.values().find(|(k, _)| *k == key).map(|(_, v)| v).unwrap()
    }

    #[test]
    fn test_duration_is_latest_track_end() {
        assert_eq!(sample_timeline().duration(), 5.0);
    }

    #[test]
    fn test_seek_midpoint() {
        let mut timeline = sample_timeline();
        assert!(timeline.seek_progress(0.5));

        assert_eq!(value(&timeline, Prop::Progress), 0.5);
        assert_eq!(value(&timeline, Prop::Spin), 5.0);
        assert!((value(&timeline, Prop::Depth) + 18.75).abs() < 1e-4);
    }

    #[test]
    fn test_tracks_hold_before_their_start() {
        let mut timeline = sample_timeline();
        timeline.seek_progress(0.1); // t = 0.5, before Depth starts at 1.0
        assert_eq!(value(&timeline, Prop::Depth), 0.0);
    }

    #[test]
    fn test_seek_clamps_and_reports_motion() {
        let mut timeline = sample_timeline();
        assert!(timeline.seek_progress(3.0));
        assert_eq!(timeline.progress(), 1.0);
        assert!(!timeline.seek_progress(1.0));
        assert!(timeline.seek_progress(-1.0));
        assert_eq!(timeline.time(), 0.0);
    }

    #[test]
    fn test_empty_timeline() {
        let mut timeline: Timeline<Prop> = Timeline::new();
        assert_eq!(timeline.duration(), 0.0);
        assert!(!timeline.seek_progress(0.7));
        assert_eq!(timeline.progress(), 0.0);
    }
}
