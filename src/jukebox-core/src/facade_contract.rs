use crate::facade::{AttrValue, FacadeError, PlayerFacade, PROGRESS_UNKNOWN};
use crate::models::{Rating, Track, TrackAttr, Volume, VolumeAction, VolumeDelta};
use thiserror::Error;

/// Fixtures supplied by a facade implementation to run the shared contract suite.
#[derive(Debug, Clone)]
pub struct FacadeContractExpectations {
    /// Tracks to enqueue; at least two so that next/prev can move.
    pub tracks: Vec<Track>,
}

/// Errors surfaced by the facade contract test harness.
#[derive(Debug, Error, PartialEq)]
pub enum FacadeContractError {
    #[error("contract needs at least two fixture tracks, got {0}")]
    NotEnoughFixtures(usize),
    #[error("fresh facade reports a current track")]
    NotIdle,
    #[error("attribute {attr} returned {value:?} with nothing playing")]
    IdleAttribute { attr: TrackAttr, value: String },
    #[error("progress with nothing playing was {0}, expected -1")]
    IdleProgress(f64),
    #[error("setting {attr} with nothing playing returned {result:?}, expected NotPlaying")]
    IdleSetAttr {
        attr: TrackAttr,
        result: Result<(), FacadeError>,
    },
    #[error("volume {before} became {after} after +{amount}/-{amount}")]
    VolumeNotRestored { before: u8, after: u8, amount: u32 },
    #[error("volume left range: set {requested} read back {actual}")]
    VolumeNotClamped { requested: i64, actual: u8 },
    #[error("enqueueing an empty batch started playback")]
    EmptyEnqueueStarted,
    #[error("enqueue with nothing playing did not start playback")]
    EnqueueDidNotStart,
    #[error("progress {0} is outside [0, 1] and is not the unknown sentinel")]
    ProgressOutOfRange(f64),
    #[error("rating set to {expected} but read back {actual:?}")]
    RatingNotApplied {
        expected: String,
        actual: Option<String>,
    },
    #[error("setting read-only attribute {attr} returned {result:?}, expected Unsupported")]
    ReadOnlyAccepted {
        attr: TrackAttr,
        result: Result<(), FacadeError>,
    },
    #[error("toggle_pause lost the current track")]
    PauseLostTrack,
    #[error("stop left a current track")]
    StopKeptTrack,
}

/// Run the shared facade contract suite against a freshly constructed facade.
///
/// The suite mutates player state; hand it a facade nobody else is using.
pub fn run_facade_contract<F: PlayerFacade + ?Sized>(
    facade: &F,
    expectations: &FacadeContractExpectations,
) -> Result<(), FacadeContractError> {
    if expectations.tracks.len() < 2 {
        return Err(FacadeContractError::NotEnoughFixtures(
            expectations.tracks.len(),
        ));
    }
    verify_idle(facade)?;
    verify_volume(facade)?;
    verify_enqueue(facade, expectations)?;
    verify_attributes(facade)?;
    verify_transport(facade)?;
    Ok(())
}

fn verify_idle<F: PlayerFacade + ?Sized>(facade: &F) -> Result<(), FacadeContractError> {
    if facade.is_playing() {
        return Err(FacadeContractError::NotIdle);
    }
    for attr in TrackAttr::ALL {
        if let Some(value) = facade.track_attr(attr) {
            return Err(FacadeContractError::IdleAttribute { attr, value });
        }
    }
    let progress = facade.progress();
    if progress != PROGRESS_UNKNOWN {
        return Err(FacadeContractError::IdleProgress(progress));
    }
    let rating = Rating::new(1).map(AttrValue::Rating);
    if let Some(value) = rating {
        let result = facade.set_track_attr(TrackAttr::Rating, value);
        if result != Err(FacadeError::NotPlaying) {
            return Err(FacadeContractError::IdleSetAttr {
                attr: TrackAttr::Rating,
                result,
            });
        }
    }
    Ok(())
}

fn verify_volume<F: PlayerFacade + ?Sized>(facade: &F) -> Result<(), FacadeContractError> {
    let original = facade.volume();

    let amount = 10;
    facade.set_volume(Volume::clamped(50));
    let before = facade.volume();
    facade.change_volume(VolumeDelta::new(VolumeAction::Increase, amount));
    let after = facade.change_volume(VolumeDelta::new(VolumeAction::Decrease, amount));
    if after != before {
        return Err(FacadeContractError::VolumeNotRestored {
            before: before.percent(),
            after: after.percent(),
            amount,
        });
    }

    for (start, delta, expected) in [
        (95, VolumeDelta::new(VolumeAction::Increase, 10), Volume::MAX),
        (5, VolumeDelta::new(VolumeAction::Decrease, 10), 0),
    ] {
        facade.set_volume(Volume::clamped(start));
        let actual = facade.change_volume(delta);
        if actual.percent() != expected {
            return Err(FacadeContractError::VolumeNotClamped {
                requested: start + delta.signed(),
                actual: actual.percent(),
            });
        }
    }

    facade.set_volume(original);
    Ok(())
}

fn verify_enqueue<F: PlayerFacade + ?Sized>(
    facade: &F,
    expectations: &FacadeContractExpectations,
) -> Result<(), FacadeContractError> {
    facade.enqueue(Vec::new());
    if facade.is_playing() {
        return Err(FacadeContractError::EmptyEnqueueStarted);
    }
    facade.enqueue(expectations.tracks.clone());
    if !facade.is_playing() {
        return Err(FacadeContractError::EnqueueDidNotStart);
    }
    let progress = facade.progress();
    if progress != PROGRESS_UNKNOWN && !(0.0..=1.0).contains(&progress) {
        return Err(FacadeContractError::ProgressOutOfRange(progress));
    }
    Ok(())
}

fn verify_attributes<F: PlayerFacade + ?Sized>(facade: &F) -> Result<(), FacadeContractError> {
    if let Some(rating) = Rating::new(3) {
        // Any error from a settable attribute surfaces as a missing read-back.
        let _ = facade.set_track_attr(TrackAttr::Rating, AttrValue::Rating(rating));
        let actual = facade.track_attr(TrackAttr::Rating);
        if actual.as_deref() != Some("3") {
            return Err(FacadeContractError::RatingNotApplied {
                expected: "3".into(),
                actual,
            });
        }

        for attr in TrackAttr::ALL.into_iter().filter(|a| !a.is_settable()) {
            let result = facade.set_track_attr(attr, AttrValue::Rating(rating));
            if !matches!(result, Err(FacadeError::Unsupported { .. })) {
                return Err(FacadeContractError::ReadOnlyAccepted { attr, result });
            }
        }
    }
    Ok(())
}

fn verify_transport<F: PlayerFacade + ?Sized>(facade: &F) -> Result<(), FacadeContractError> {
    facade.toggle_pause();
    if !facade.is_playing() {
        return Err(FacadeContractError::PauseLostTrack);
    }
    facade.toggle_pause();
    facade.next();
    facade.prev();
    facade.stop();
    if facade.is_playing() {
        return Err(FacadeContractError::StopKeptTrack);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrackId;

    #[test]
    fn contract_requires_two_fixtures() {
        struct Unused;
        impl PlayerFacade for Unused {
            fn is_playing(&self) -> bool {
                unreachable!()
            }
            fn track_attr(&self, _attr: TrackAttr) -> Option<String> {
                unreachable!()
            }
            fn set_track_attr(&self, _attr: TrackAttr, _value: AttrValue) -> Result<(), FacadeError> {
                unreachable!()
            }
            fn volume(&self) -> Volume {
                unreachable!()
            }
            fn set_volume(&self, _volume: Volume) {}
            fn change_volume(&self, _delta: VolumeDelta) -> Volume {
                unreachable!()
            }
            fn play(&self) {}
            fn stop(&self) {}
            fn next(&self) {}
            fn prev(&self) {}
            fn toggle_pause(&self) {}
            fn progress(&self) -> f64 {
                unreachable!()
            }
            fn enqueue(&self, _tracks: Vec<Track>) {}
        }

        let expectations = FacadeContractExpectations {
            tracks: vec![Track::from_location(TrackId::new("/a.mp3").0, "a")],
        };
        assert_eq!(
            run_facade_contract(&Unused, &expectations),
            Err(FacadeContractError::NotEnoughFixtures(1))
        );
    }
}
