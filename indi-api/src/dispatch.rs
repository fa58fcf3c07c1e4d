//! The incoming-command router.
//!
//! Grounded on `dispatch()` in `indidriver.c`: classify the root tag,
//! gate on protocol version, consult the registry for authorization,
//! decode the per-family value array, and invoke the driver's handler.
//! Malformed individual members are warned about in-band and dropped;
//! the well-formed remainder of the command is still delivered.

use crate::context::{DriverContext, PROTOCOL_VERSION};
use crate::emit;
use crate::property::SwitchState;
use crate::sexagesimal;
use crate::types::name::{Device, Key, Property};
use crate::types::{Error, Result};
use crate::update::BlobUpdate;
use crate::xml::Element;
use tracing::warn;

/// The decoded result of dispatching one XML element.
///
/// An unrecognized root tag is its own `Error::UnknownCommand` variant
/// rather than a second `Outcome`, so it is distinguishable from
/// authorization and decoding failures without a second success-ish type.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The tag was recognized and handled (possibly after rejecting
    /// individual malformed members in-band).
    Handled,
}

/// Driver-supplied callbacks the dispatcher invokes once authorization
/// and decoding have succeeded. Implemented by the concrete driver;
/// `indi-api` supplies only the routing and validation around it.
pub trait Handlers {
    /// `getProperties` with no `device`+`name` pair already registered
    /// to re-Define: broadcast all (optionally device-filtered)
    /// properties.
    fn broadcast_properties(&self, ctx: &DriverContext, device: Option<&Device>);

    /// Traffic that isn't addressed to this driver but may be of
    /// interest to a snooping driver: `setXxxVector`, `defXxxVector`,
    /// `message`, `delProperty`.
    fn snoop(&self, ctx: &DriverContext, element: &Element);

    fn new_number(&self, ctx: &DriverContext, key: &Key, values: Vec<(String, f64)>);
    fn new_switch(&self, ctx: &DriverContext, key: &Key, values: Vec<(String, SwitchState)>);
    fn new_text(&self, ctx: &DriverContext, key: &Key, values: Vec<(String, String)>);
    fn new_blob(&self, ctx: &DriverContext, key: &Key, values: Vec<BlobUpdate>);
}

const SNOOP_TAGS: &[&str] = &[
    "setNumberVector",
    "setTextVector",
    "setLightVector",
    "setSwitchVector",
    "setBLOBVector",
    "defNumberVector",
    "defTextVector",
    "defLightVector",
    "defSwitchVector",
    "defBLOBVector",
    "message",
    "delProperty",
];

fn device_and_property(element: &Element) -> Result<(Device, Property)> {
    let device = element
        .attr("device")
        .ok_or_else(|| Error::BadFormat("missing device attribute".into()))?;
    let name = element
        .attr("name")
        .ok_or_else(|| Error::BadFormat("missing name attribute".into()))?;
    Ok((Device::new(device)?, Property::new(name)?))
}

/// Re-emits the Define for an already-registered property in response
/// to a targeted `getProperties`, rather than a Set -- a client asking
/// again needs the full member metadata, not just fresh values.
fn redefine(ctx: &DriverContext, key: &Key) -> Result<()> {
    use crate::property::Handle;

    let Some(handle) = ctx.registry.lookup(key) else {
        return Ok(());
    };
    let sink = ctx.sink.as_ref();
    let result = match handle {
        Handle::Text(h) => emit::define_text(sink, &ctx.registry, &h, None),
        Handle::Number(h) => emit::define_number(sink, &ctx.registry, &h, None),
        Handle::Switch(h) => emit::define_switch(sink, &ctx.registry, &h, None),
        Handle::Blob(h) => emit::define_blob(sink, &ctx.registry, &h, None),
    };
    result.map_err(|e| Error::Fatal(e.to_string()))
}

fn handle_get_properties(ctx: &DriverContext, handlers: &dyn Handlers, element: &Element) -> Result<Outcome> {
    let version = element
        .attr("version")
        .ok_or_else(|| Error::Fatal("getProperties missing version".into()))?;
    let requested: f64 = version
        .parse()
        .map_err(|_| Error::Fatal(format!("getProperties has unparseable version: {}", version)))?;
    let compiled: f64 = PROTOCOL_VERSION.parse().expect("PROTOCOL_VERSION is a valid float");
    if requested > compiled {
        return Err(Error::Fatal(format!(
            "client version {} > {}",
            requested, compiled
        )));
    }

    let device = element.attr("device");
    let name = element.attr("name");

    if let (Some(device), Some(name)) = (device, name) {
        let key = Key::new(Device::new(device)?, Property::new(name)?);
        redefine(ctx, &key)?;
        return Ok(Outcome::Handled);
    }

    let device = match device {
        Some(d) => Some(Device::new(d)?),
        None => None,
    };
    handlers.broadcast_properties(ctx, device.as_ref());
    Ok(Outcome::Handled)
}

fn authorize(ctx: &DriverContext, key: &Key) -> Result<()> {
    if !ctx.registry.contains(key) {
        return Err(Error::UnknownProperty(
            key.property.to_string(),
            key.device.to_string(),
        ));
    }
    ctx.registry.check_writable(key)
}

fn handle_new_number(ctx: &DriverContext, handlers: &dyn Handlers, element: &Element) -> Result<Outcome> {
    let (device, property) = device_and_property(element)?;
    let key = Key::new(device.clone(), property.clone());
    authorize(ctx, &key)?;

    let mut values = Vec::new();
    for child in element.find_all("oneNumber") {
        let Some(name) = child.attr("name") else { continue };
        match sexagesimal::parse(child.text_trimmed()) {
            Ok(value) => values.push((name.to_string(), value)),
            Err(_) => {
                let _ = emit::message(
                    ctx.sink.as_ref(),
                    &device,
                    &format!("[ERROR] {}: Bad format {}", property, child.text_trimmed()),
                );
            }
        }
    }

    if values.is_empty() {
        let _ = emit::message(
            ctx.sink.as_ref(),
            &device,
            &format!("[ERROR] {}: newNumberVector with no valid members", property),
        );
    } else {
        handlers.new_number(ctx, &key, values);
    }
    Ok(Outcome::Handled)
}

fn handle_new_switch(ctx: &DriverContext, handlers: &dyn Handlers, element: &Element) -> Result<Outcome> {
    let (device, property) = device_and_property(element)?;
    let key = Key::new(device.clone(), property.clone());
    authorize(ctx, &key)?;

    let mut values = Vec::new();
    for child in element.find_all("oneSwitch") {
        let Some(name) = child.attr("name") else { continue };
        let text = child.text_trimmed();
        if text.starts_with("On") {
            values.push((name.to_string(), SwitchState::On));
        } else if text == "Off" {
            values.push((name.to_string(), SwitchState::Off));
        } else {
            let _ = emit::message(
                ctx.sink.as_ref(),
                &device,
                &format!("[ERROR] {}: must be On or Off: {}", property, text),
            );
        }
    }

    if values.is_empty() {
        let _ = emit::message(
            ctx.sink.as_ref(),
            &device,
            &format!("[ERROR] {}: newSwitchVector with no valid members", property),
        );
    } else {
        handlers.new_switch(ctx, &key, values);
    }
    Ok(Outcome::Handled)
}

fn handle_new_text(ctx: &DriverContext, handlers: &dyn Handlers, element: &Element) -> Result<Outcome> {
    let (device, property) = device_and_property(element)?;
    let key = Key::new(device.clone(), property.clone());
    authorize(ctx, &key)?;

    let mut values = Vec::new();
    for child in element.find_all("oneText") {
        let Some(name) = child.attr("name") else { continue };
        values.push((name.to_string(), child.text.clone()));
    }

    if values.is_empty() {
        let _ = emit::message(
            ctx.sink.as_ref(),
            &device,
            &format!("[ERROR] {}: set with no valid members", property),
        );
    } else {
        handlers.new_text(ctx, &key, values);
    }
    Ok(Outcome::Handled)
}

fn handle_new_blob(ctx: &DriverContext, handlers: &dyn Handlers, element: &Element) -> Result<Outcome> {
    let (device, property) = device_and_property(element)?;
    let key = Key::new(device.clone(), property.clone());
    authorize(ctx, &key)?;

    let mut values = Vec::new();
    for child in element.find_all("oneBLOB") {
        let (Some(name), Some(format), Some(size)) =
            (child.attr("name"), child.attr("format"), child.attr("size"))
        else {
            continue;
        };
        let Ok(size): std::result::Result<usize, _> = size.parse() else {
            continue;
        };
        let encoded = child.text_trimmed();
        match crate::base64::decode(encoded) {
            Ok(bytes) => {
                let blobsize = bytes.len();
                values.push(BlobUpdate {
                    name: name.to_string(),
                    size,
                    blobsize,
                    bytes,
                    format: format.to_string(),
                });
            }
            Err(e) => {
                warn!(%e, "malformed BLOB payload for {}", property);
            }
        }
    }

    if values.is_empty() {
        let _ = emit::message(
            ctx.sink.as_ref(),
            &device,
            &format!("[ERROR] {}: newBLOBVector with no valid members", property),
        );
    } else {
        handlers.new_blob(ctx, &key, values);
    }
    Ok(Outcome::Handled)
}

/// Routes one parsed XML element. Returns `Err(Error::Fatal(_))` only
/// for protocol-version incompatibility; the caller (the driver's main
/// loop) is expected to log it and exit the process, matching the
/// original implementation's `exit(1)`.
pub fn dispatch(ctx: &DriverContext, handlers: &dyn Handlers, element: &Element) -> Result<Outcome> {
    match element.tag.as_str() {
        "getProperties" => handle_get_properties(ctx, handlers, element),
        tag if SNOOP_TAGS.contains(&tag) => {
            handlers.snoop(ctx, element);
            Ok(Outcome::Handled)
        }
        "newNumberVector" => handle_new_number(ctx, handlers, element),
        "newSwitchVector" => handle_new_switch(ctx, handlers, element),
        "newTextVector" => handle_new_text(ctx, handlers, element),
        "newBLOBVector" => handle_new_blob(ctx, handlers, element),
        other => {
            warn!(tag = other, "unknown command");
            Err(Error::UnknownCommand(other.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::BlobHandling;
    use crate::property::{NumberMember, NumberVector, Permission};
    use crate::sink::StreamSink;
    use std::cell::RefCell;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingHandlers {
        new_numbers: RefCell<Vec<(String, Vec<(String, f64)>)>>,
    }

    impl Handlers for RecordingHandlers {
        fn broadcast_properties(&self, _ctx: &DriverContext, _device: Option<&Device>) {}
        fn snoop(&self, _ctx: &DriverContext, _element: &Element) {}
        fn new_number(&self, _ctx: &DriverContext, key: &Key, values: Vec<(String, f64)>) {
            self.new_numbers.borrow_mut().push((key.property.to_string(), values));
        }
        fn new_switch(&self, _ctx: &DriverContext, _key: &Key, _values: Vec<(String, SwitchState)>) {}
        fn new_text(&self, _ctx: &DriverContext, _key: &Key, _values: Vec<(String, String)>) {}
        fn new_blob(&self, _ctx: &DriverContext, _key: &Key, _values: Vec<BlobUpdate>) {}
    }

    fn parse(xml: &str) -> Element {
        let mut reader = quick_xml::reader::Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        crate::xml::read_element(&mut reader).unwrap().unwrap()
    }

    fn context() -> DriverContext {
        DriverContext::new(Arc::new(StreamSink::new(Vec::<u8>::new())))
    }

    #[test]
    fn version_gate_rejects_future_version() {
        let ctx = context();
        let handlers = RecordingHandlers::default();
        let element = parse(r#"<getProperties version="99.0"/>"#);
        let err = dispatch(&ctx, &handlers, &element).unwrap_err();
        assert!(matches!(err, Error::Fatal(_)));
    }

    #[test]
    fn new_number_against_unregistered_property_is_rejected() {
        let ctx = context();
        let handlers = RecordingHandlers::default();
        let element = parse(
            r#"<newNumberVector device="Mount" name="TIME"><oneNumber name="UTC">5</oneNumber></newNumberVector>"#,
        );
        let err = dispatch(&ctx, &handlers, &element).unwrap_err();
        assert!(matches!(err, Error::UnknownProperty(_, _)));
    }

    #[test]
    fn read_only_property_rejects_new_number() {
        let ctx = context();
        let key = Key::new(Device::new("Mount").unwrap(), Property::new("TIME").unwrap());
        let vector = NumberVector::new(
            key.device.clone(),
            key.property.clone(),
            "Time",
            Permission::ReadOnly,
            vec![NumberMember::new("UTC", "UTC", "%f", 0.0, 24.0, 0.0, 0.0)],
        );
        ctx.registry.register_unique(
            key.clone(),
            crate::property::Handle::Number(Arc::new(Mutex::new(vector))),
        );

        let handlers = RecordingHandlers::default();
        let element = parse(
            r#"<newNumberVector device="Mount" name="TIME"><oneNumber name="UTC">5</oneNumber></newNumberVector>"#,
        );
        let err = dispatch(&ctx, &handlers, &element).unwrap_err();
        assert!(matches!(err, Error::ReadOnly(_)));
        assert_eq!(err.to_string(), "Cannot set read-only property TIME");
    }

    #[test]
    fn writable_number_is_delivered_to_handler() {
        let ctx = context();
        let key = Key::new(Device::new("Mount").unwrap(), Property::new("TIME").unwrap());
        let vector = NumberVector::new(
            key.device.clone(),
            key.property.clone(),
            "Time",
            Permission::ReadWrite,
            vec![NumberMember::new("UTC", "UTC", "%f", 0.0, 24.0, 0.0, 0.0)],
        );
        ctx.registry.register_unique(
            key.clone(),
            crate::property::Handle::Number(Arc::new(Mutex::new(vector))),
        );

        let handlers = RecordingHandlers::default();
        let element = parse(
            r#"<newNumberVector device="Mount" name="TIME"><oneNumber name="UTC">5.5</oneNumber></newNumberVector>"#,
        );
        dispatch(&ctx, &handlers, &element).unwrap();
        let recorded = handlers.new_numbers.borrow();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].1, vec![("UTC".to_string(), 5.5)]);
    }

    #[test]
    fn malformed_members_are_dropped_but_others_still_delivered() {
        let ctx = context();
        let key = Key::new(Device::new("Mount").unwrap(), Property::new("TIME").unwrap());
        let vector = NumberVector::new(
            key.device.clone(),
            key.property.clone(),
            "Time",
            Permission::ReadWrite,
            vec![
                NumberMember::new("UTC", "UTC", "%f", 0.0, 24.0, 0.0, 0.0),
                NumberMember::new("OFFSET", "Offset", "%f", -12.0, 12.0, 0.0, 0.0),
            ],
        );
        ctx.registry.register_unique(
            key.clone(),
            crate::property::Handle::Number(Arc::new(Mutex::new(vector))),
        );

        let handlers = RecordingHandlers::default();
        let element = parse(
            r#"<newNumberVector device="Mount" name="TIME">
                <oneNumber name="UTC">garbage</oneNumber>
                <oneNumber name="OFFSET">1.5</oneNumber>
            </newNumberVector>"#,
        );
        dispatch(&ctx, &handlers, &element).unwrap();
        let recorded = handlers.new_numbers.borrow();
        assert_eq!(recorded[0].1, vec![("OFFSET".to_string(), 1.5)]);
    }

    #[test]
    fn unknown_command_is_reported() {
        let ctx = context();
        let handlers = RecordingHandlers::default();
        let element = parse(r#"<bogusTag/>"#);
        let err = dispatch(&ctx, &handlers, &element).unwrap_err();
        assert_eq!(err.to_string(), "Unknown command: bogusTag");
    }

    #[test]
    fn snoop_traffic_is_routed_without_authorization() {
        let ctx = context();
        let handlers = RecordingHandlers::default();
        let element = parse(r#"<message device="Other" message="hi"/>"#);
        assert_eq!(dispatch(&ctx, &handlers, &element).unwrap(), Outcome::Handled);
    }

    #[test]
    fn blob_handling_display_matches_wire_values() {
        assert_eq!(BlobHandling::Also.to_string(), "Also");
    }
}
