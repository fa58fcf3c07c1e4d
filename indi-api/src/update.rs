//! Two-phase validate-then-apply helpers that merge a decoded
//! `(name, value)` array into a property aggregate.
//!
//! Each function is grounded line-for-line on `IUUpdateSwitch` /
//! `IUUpdateNumber` / `IUUpdateText` / `IUUpdateBLOB` in
//! `indidriver.c`: a first pass over the whole request validates
//! without mutating, and only if every entry passes does a second
//! pass apply them, so a single bad member can never leave an
//! aggregate partially updated.
//!
//! On success these functions do not emit; the caller (the
//! dispatcher, or a driver handler) is responsible for emitting the
//! post-update state via the matching `set_*` function in [`crate::emit`].

use crate::property::{BlobVector, NumberVector, State, SwitchRule, SwitchState, SwitchVector, TextVector};
use crate::types::{Error, Result};

/// Applies `(name, value)` pairs to `vector` under its switch rule.
///
/// For `OneOfMany`, the previously-`On` member is snapshotted before
/// the new states are applied; if the result is not exactly one `On`
/// member, every member is reset and the snapshot is restored.
pub fn update_switch(vector: &mut SwitchVector, updates: &[(&str, SwitchState)]) -> Result<()> {
    let previous_on = if vector.rule == SwitchRule::OneOfMany {
        let name = vector.on_name().map(str::to_string);
        for m in vector.members.iter_mut() {
            m.state = SwitchState::Off;
        }
        name
    } else {
        None
    };

    for (name, state) in updates {
        match vector.find_mut(name) {
            Some(member) => member.state = *state,
            None => {
                vector.state = State::Idle;
                return Err(Error::BadMember(format!(
                    "{} is not a member of {} ({}) property.",
                    name, vector.label, vector.name
                )));
            }
        }
    }

    if vector.rule == SwitchRule::OneOfMany {
        let on_count = vector.members.iter().filter(|m| m.state == SwitchState::On).count();
        if on_count != 1 {
            for m in vector.members.iter_mut() {
                m.state = SwitchState::Off;
            }
            if let Some(name) = previous_on {
                if let Some(member) = vector.find_mut(&name) {
                    member.state = SwitchState::On;
                }
            }
            vector.state = State::Idle;
            return Err(Error::BadMember(format!(
                "invalid state switch for property {} ({}). Only one switch can be on.",
                vector.label, vector.name
            )));
        }
    }

    Ok(())
}

/// Validates and applies `(name, value)` pairs to `vector`. Phase 1
/// checks every name exists and every value lies in `[min, max]`;
/// phase 2 applies only if phase 1 passed entirely.
pub fn update_number(vector: &mut NumberVector, updates: &[(&str, f64)]) -> Result<()> {
    for (name, value) in updates {
        match vector.find(name) {
            None => {
                vector.state = State::Idle;
                return Err(Error::BadMember(format!(
                    "{} is not a member of {} ({}) property.",
                    name, vector.label, vector.name
                )));
            }
            Some(member) if !member.in_range(*value) => {
                vector.state = State::Alert;
                return Err(Error::OutOfRange(format!(
                    "Invalid range for {} ({}). Valid range is from {} to {}. Requested value is {}",
                    member.label, member.name, member.min, member.max, value
                )));
            }
            Some(_) => {}
        }
    }

    for (name, value) in updates {
        if let Some(member) = vector.find_mut(name) {
            member.value = *value;
        }
    }

    Ok(())
}

/// Validates and applies `(name, value)` pairs to `vector`. Phase 1
/// is an existence check only; phase 2 copies the new text.
pub fn update_text(vector: &mut TextVector, updates: &[(&str, &str)]) -> Result<()> {
    for (name, _) in updates {
        if vector.find(name).is_none() {
            vector.state = State::Idle;
            return Err(Error::BadMember(format!(
                "{} is not a member of {} ({}) property.",
                name, vector.label, vector.name
            )));
        }
    }

    for (name, value) in updates {
        if let Some(member) = vector.find_mut(name) {
            member.value = value.to_string();
        }
    }

    Ok(())
}

/// One decoded BLOB payload to adopt into a `BlobVector` member.
pub struct BlobUpdate {
    pub name: String,
    pub size: usize,
    pub blobsize: usize,
    pub bytes: Vec<u8>,
    pub format: String,
}

/// Validates and applies decoded BLOB payloads to `vector`, mirroring
/// `update_text`'s two-phase shape.
pub fn update_blob(vector: &mut BlobVector, updates: Vec<BlobUpdate>) -> Result<()> {
    for update in &updates {
        if vector.find(&update.name).is_none() {
            vector.state = State::Idle;
            return Err(Error::BadMember(format!(
                "{} is not a member of {} ({}) property.",
                update.name, vector.label, vector.name
            )));
        }
    }

    for update in updates {
        if let Some(member) = vector.find_mut(&update.name) {
            member.save(update.size, update.blobsize, update.bytes, update.format);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{BlobMember, NumberMember, Permission, SwitchMember, TextMember};
    use crate::types::name::{Device, Property};

    fn dev() -> Device {
        Device::new("Mount").unwrap()
    }

    #[test]
    fn number_update_is_atomic_on_range_failure() {
        let mut vector = NumberVector::new(
            dev(),
            Property::new("COORDS").unwrap(),
            "Coords",
            Permission::ReadWrite,
            vec![
                NumberMember::new("A", "A", "%f", 0.0, 10.0, 0.0, 0.0),
                NumberMember::new("B", "B", "%f", 0.0, 10.0, 0.0, 0.0),
            ],
        );

        let result = update_number(&mut vector, &[("A", 5.0), ("B", 99.0)]);
        assert!(result.is_err());
        assert_eq!(vector.find("A").unwrap().value, 0.0);
        assert_eq!(vector.find("B").unwrap().value, 0.0);
        assert_eq!(vector.state, State::Alert);
    }

    #[test]
    fn number_update_applies_when_all_valid() {
        let mut vector = NumberVector::new(
            dev(),
            Property::new("COORDS").unwrap(),
            "Coords",
            Permission::ReadWrite,
            vec![NumberMember::new("A", "A", "%f", 0.0, 10.0, 0.0, 0.0)],
        );
        update_number(&mut vector, &[("A", 5.0)]).unwrap();
        assert_eq!(vector.find("A").unwrap().value, 5.0);
    }

    #[test]
    fn one_of_many_switch_restores_on_failure() {
        let mut vector = SwitchVector::new(
            dev(),
            Property::new("SLEW").unwrap(),
            "Slew",
            Permission::ReadWrite,
            SwitchRule::OneOfMany,
            vec![
                SwitchMember::new("FAST", "Fast", SwitchState::On),
                SwitchMember::new("SLOW", "Slow", SwitchState::Off),
            ],
        );

        let result = update_switch(&mut vector, &[("FAST", SwitchState::Off), ("SLOW", SwitchState::Off)]);
        assert!(result.is_err());
        assert_eq!(vector.on_name(), Some("FAST"));
        assert_eq!(vector.state, State::Idle);
    }

    #[test]
    fn one_of_many_switch_succeeds_with_exactly_one_on() {
        let mut vector = SwitchVector::new(
            dev(),
            Property::new("SLEW").unwrap(),
            "Slew",
            Permission::ReadWrite,
            SwitchRule::OneOfMany,
            vec![
                SwitchMember::new("FAST", "Fast", SwitchState::On),
                SwitchMember::new("SLOW", "Slow", SwitchState::Off),
            ],
        );

        update_switch(&mut vector, &[("SLOW", SwitchState::On)]).unwrap();
        assert_eq!(vector.on_name(), Some("SLOW"));
    }

    #[test]
    fn text_update_rejects_unknown_member() {
        let mut vector = TextVector::new(
            dev(),
            Property::new("SITE").unwrap(),
            "Site",
            Permission::ReadWrite,
            vec![TextMember::new("NAME", "Name", "")],
        );
        assert!(update_text(&mut vector, &[("MISSING", "x")]).is_err());
        assert_eq!(vector.find("NAME").unwrap().value, "");
    }

    #[test]
    fn blob_update_adopts_payload() {
        let mut vector = BlobVector::new(
            dev(),
            Property::new("IMAGE").unwrap(),
            "Image",
            Permission::ReadOnly,
            vec![BlobMember::new("CCD1", "Primary")],
        );
        let updates = vec![BlobUpdate {
            name: "CCD1".to_string(),
            size: 4,
            blobsize: 4,
            bytes: vec![1, 2, 3, 4],
            format: ".fits".to_string(),
        }];
        update_blob(&mut vector, updates).unwrap();
        assert_eq!(vector.find("CCD1").unwrap().bytes, vec![1, 2, 3, 4]);
    }
}
