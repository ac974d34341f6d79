//! Bus frame codec for the Paddle, Ball and Score messages.
//!
//! Every position travels as one byte per axis. Encoding clamps into the axis'
//! wire range; decoding reflects the configured axes into the receiver's own
//! frame, since both devices draw themselves on the right-hand side.

use crate::config::{BallLayout, FrameIds, MirrorConfig, NodeConfig};
use crate::constants::VELOCITY_WIRE_FRAC_BITS;
use crate::fixed::{from_fixed_round, FRAC_BITS, I};
use crate::types::{BallState, BusFrame, ScoreState};

const VELOCITY_SHIFT: u32 = FRAC_BITS - VELOCITY_WIRE_FRAC_BITS;

/// Reflects a coordinate across an axis of `extent` pixels. Applying it twice is the identity.
#[inline]
pub fn mirror(value: i32, extent: i32) -> i32 {
    (extent - 1) - value
}

/// Clamps a pixel coordinate into one wire byte for an axis of `extent` pixels (at most 256).
#[inline]
pub fn quantize(value: i32, extent: i32) -> u8 {
    value.clamp(0, extent.clamp(1, 256) - 1) as u8
}

#[inline]
pub fn encode_velocity(v: I) -> i8 {
    let rounded = (v + (1 << (VELOCITY_SHIFT - 1))) >> VELOCITY_SHIFT;
    rounded.clamp(i8::MIN as I, i8::MAX as I) as i8
}

#[inline]
pub fn decode_velocity(b: i8) -> I {
    (b as I) << VELOCITY_SHIFT
}

/// Ball frame contents, already in the receiver's frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BallUpdate {
    pub x: i32,
    pub y: i32,
    pub velocity: Option<(I, I)>,
}

/// A frame that decoded cleanly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// Opponent paddle center row.
    Paddle(i32),
    Ball(BallUpdate),
    Score(ScoreState),
}

/// Why a frame was thrown away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Discard {
    ForeignId(u32),
    ShortPayload { id: u32, len: usize, needed: usize },
    Loopback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkCodec {
    ids: FrameIds,
    mirror: MirrorConfig,
    layout: BallLayout,
    node_id: u8,
    paddle_extent: i32,
    x_extent: i32,
    y_extent: i32,
}

impl LinkCodec {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            ids: config.frame_ids(),
            mirror: config.protocol.mirror,
            layout: config.protocol.ball_layout,
            node_id: config.node_id,
            paddle_extent: config.geometry.screen_height,
            x_extent: config.geometry.screen_width,
            y_extent: config.geometry.screen_height,
        }
    }

    pub fn ids(&self) -> FrameIds { self.ids }

    pub fn encode_paddle(&self, center: i32) -> BusFrame {
        BusFrame::new(self.ids.paddle, &[quantize(center, self.paddle_extent)])
    }

    pub fn decode_paddle(&self, frame: &BusFrame) -> Option<i32> {
        match self.decode(frame) {
            Ok(Inbound::Paddle(center)) => Some(center),
            _ => None,
        }
    }

    pub fn encode_ball(&self, ball: &BallState) -> BusFrame {
        let mut buf = [0u8; 5];
        buf[0] = quantize(from_fixed_round(ball.x), self.x_extent);
        buf[1] = quantize(from_fixed_round(ball.y), self.y_extent);
        let mut len = 2;
        if self.layout.velocity {
            buf[2] = encode_velocity(ball.vx) as u8;
            buf[3] = encode_velocity(ball.vy) as u8;
            len = 4;
        }
        if self.layout.sender_id {
            buf[len] = self.node_id;
            len += 1;
        }
        BusFrame::new(self.ids.ball, &buf[..len])
    }

    pub fn decode_ball(&self, frame: &BusFrame) -> Option<BallUpdate> {
        match self.decode(frame) {
            Ok(Inbound::Ball(update)) => Some(update),
            _ => None,
        }
    }

    pub fn encode_score(&self, score: &ScoreState) -> BusFrame {
        BusFrame::new(self.ids.score, &[score.left, score.right])
    }

    pub fn decode_score(&self, frame: &BusFrame) -> Option<ScoreState> {
        match self.decode(frame) {
            Ok(Inbound::Score(score)) => Some(score),
            _ => None,
        }
    }

    /// Classifies and decodes one frame. Nothing is produced for a frame that fails any check.
    pub fn decode(&self, frame: &BusFrame) -> Result<Inbound, Discard> {
        let payload = frame.payload();
        let needed = if frame.id == self.ids.paddle {
            1
        } else if frame.id == self.ids.ball {
            self.layout.payload_len()
        } else if frame.id == self.ids.score {
            2
        } else {
            return Err(Discard::ForeignId(frame.id));
        };
        if payload.len() < needed {
            return Err(Discard::ShortPayload { id: frame.id, len: payload.len(), needed });
        }

        if frame.id == self.ids.paddle {
            let mut center = i32::from(payload[0]);
            if self.mirror.paddle {
                center = mirror(center, self.paddle_extent);
            }
            return Ok(Inbound::Paddle(center));
        }

        if frame.id == self.ids.score {
            return Ok(Inbound::Score(ScoreState { left: payload[0], right: payload[1] }));
        }

        if self.layout.sender_id && payload[needed - 1] == self.node_id {
            return Err(Discard::Loopback);
        }
        let mut x = i32::from(payload[0]);
        let mut y = i32::from(payload[1]);
        if self.mirror.ball_x {
            x = mirror(x, self.x_extent);
        }
        if self.mirror.ball_y {
            y = mirror(y, self.y_extent);
        }
        let velocity = self.layout.velocity.then(|| {
            let mut vx = decode_velocity(payload[2] as i8);
            let mut vy = decode_velocity(payload[3] as i8);
            if self.mirror.ball_x {
                vx = -vx;
            }
            if self.mirror.ball_y {
                vy = -vy;
            }
            (vx, vy)
        });
        Ok(Inbound::Ball(BallUpdate { x, y, velocity }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{to_fixed_int, ONE};
    use proptest::prelude::*;

    fn codec_with(f: impl FnOnce(&mut NodeConfig)) -> LinkCodec {
        let mut cfg = NodeConfig::default();
        f(&mut cfg);
        LinkCodec::new(&cfg)
    }

    #[test]
    fn paddle_center_is_mirrored_on_receiver() {
        let sender = codec_with(|_| {});
        let receiver = codec_with(|c| c.protocol.mirror.paddle = true);
        let frame = sender.encode_paddle(30);
        assert_eq!(frame.payload(), &[30]);
        assert_eq!(receiver.decode_paddle(&frame), Some(33));
    }

    #[test]
    fn paddle_encoding_clamps_instead_of_wrapping() {
        let codec = codec_with(|_| {});
        assert_eq!(codec.encode_paddle(-5).payload(), &[0]);
        assert_eq!(codec.encode_paddle(300).payload(), &[63]);
    }

    #[test]
    fn ball_x_mirrors_across_screen_width() {
        let codec = codec_with(|_| {});
        let ball = BallState::at_pixel(100, 20, ONE, ONE);
        let frame = codec.encode_ball(&ball);
        assert_eq!(frame.payload(), &[100, 20]);
        let update = codec.decode_ball(&frame).expect("ball decodes");
        assert_eq!((update.x, update.y), (27, 20));
        assert_eq!(update.velocity, None);
    }

    #[test]
    fn ball_position_is_clamped_before_wire() {
        let codec = codec_with(|_| {});
        let ball = BallState::at_pixel(-40, 500, 0, 0);
        assert_eq!(codec.encode_ball(&ball).payload(), &[0, 63]);
    }

    #[test]
    fn ball_velocity_flips_with_mirrored_axis() {
        let codec = codec_with(|c| c.protocol.ball_layout.velocity = true);
        let ball = BallState::at_pixel(64, 32, -ONE, ONE / 2);
        let frame = codec.encode_ball(&ball);
        assert_eq!(frame.payload(), &[64, 32, (-16i8) as u8, 8]);
        let update = codec.decode_ball(&frame).expect("ball decodes");
        assert_eq!(update.velocity, Some((ONE, ONE / 2)));
    }

    #[test]
    fn own_ball_frames_are_filtered() {
        let a = codec_with(|c| {
            c.node_id = 1;
            c.protocol.ball_layout.sender_id = true;
        });
        let b = codec_with(|c| {
            c.node_id = 2;
            c.protocol.ball_layout.sender_id = true;
        });
        let frame = a.encode_ball(&BallState::at_pixel(10, 10, 0, 0));
        assert_eq!(frame.payload(), &[10, 10, 1]);
        assert_eq!(a.decode(&frame), Err(Discard::Loopback));
        assert!(b.decode_ball(&frame).is_some());
    }

    #[test]
    fn short_ball_frame_is_discarded() {
        let codec = codec_with(|_| {});
        let frame = BusFrame::new(codec.ids().ball, &[12]);
        assert_eq!(
            codec.decode(&frame),
            Err(Discard::ShortPayload { id: codec.ids().ball, len: 1, needed: 2 })
        );
    }

    #[test]
    fn foreign_identifier_is_discarded() {
        let ours = codec_with(|_| {});
        let theirs = codec_with(|c| c.group = 6);
        let frame = theirs.encode_paddle(10);
        assert_eq!(ours.decode(&frame), Err(Discard::ForeignId(26)));
    }

    #[test]
    fn score_is_copied_verbatim() {
        let codec = codec_with(|c| c.protocol.mirror = MirrorConfig { paddle: true, ball_x: true, ball_y: true });
        let frame = codec.encode_score(&ScoreState { left: 3, right: 7 });
        assert_eq!(codec.decode_score(&frame), Some(ScoreState { left: 3, right: 7 }));
    }

    #[test]
    fn velocity_saturates_at_byte_range() {
        assert_eq!(encode_velocity(to_fixed_int(100)), i8::MAX);
        assert_eq!(encode_velocity(to_fixed_int(-100)), i8::MIN);
    }

    proptest! {
        #[test]
        fn mirror_is_involutive(extent in 1i32..=256, seed in 0i32..256) {
            let v = seed % extent;
            prop_assert_eq!(mirror(mirror(v, extent), extent), v);
        }

        #[test]
        fn paddle_round_trip_within_half_step(p in 0i32..64, mirrored in any::<bool>()) {
            let sender = codec_with(|_| {});
            let receiver = codec_with(|c| c.protocol.mirror.paddle = mirrored);
            let got = receiver.decode_paddle(&sender.encode_paddle(p)).unwrap();
            let back = if mirrored { mirror(got, 64) } else { got };
            prop_assert!((back - p).abs() * 2 <= 1);
        }

        #[test]
        fn ball_round_trip_within_half_pixel(x in 0i64..(127 << 16), y in 0i64..(63 << 16)) {
            let sender = codec_with(|_| {});
            let receiver = codec_with(|c| c.protocol.mirror.ball_x = false);
            let ball = BallState { x, y, vx: 0, vy: 0 };
            let update = receiver.decode_ball(&sender.encode_ball(&ball)).unwrap();
            prop_assert!((to_fixed_int(update.x) - x).abs() <= ONE / 2);
            prop_assert!((to_fixed_int(update.y) - y).abs() <= ONE / 2);
        }
    }
}
