//! Outbound XML: Define/Set/Delete for each property family, plus
//! `message`, `delProperty`, `getProperties` (used for snooping) and
//! `enableBLOB`.
//!
//! There is no crate for an INDI-specific element writer, so it is
//! written out by hand here, matching the wire element shapes. Every
//! `Define` emitter also registers the property in the
//! `PropertyRegistry` (`IDDefXxx` calling `rosc_add_unique` in the C
//! driver this crate models) -- except `Light`, which is never a
//! target of `newXxxVector` and so is never registered.

use crate::property::{
    BlobVector, Handle, LightVector, NumberVector, Permission, State, SwitchRule, SwitchState,
    SwitchVector, TextVector,
};
use crate::registry::PropertyRegistry;
use crate::sexagesimal;
use crate::sink::ByteSink;
use crate::types::name::{Device, Property};
use crate::types::name::Key;
use std::io;
use std::sync::{Arc, Mutex};

/// The three BLOB-subscription modes a driver can request from
/// another driver's properties via `enableBLOB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobHandling {
    Never,
    Also,
    Only,
}

impl std::fmt::Display for BlobHandling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BlobHandling::Never => "Never",
            BlobHandling::Also => "Also",
            BlobHandling::Only => "Only",
        };
        write!(f, "{}", s)
    }
}

pub(crate) fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn message_child(message: Option<&str>) -> String {
    match message {
        Some(m) => format!("    <message>{}</message>\n", escape(m)),
        None => String::new(),
    }
}

fn open_vector_tag(kind: &str, verb: &str, device: &str, name: &str, label: &str, perm: Permission, state: State) -> String {
    format!(
        "<{}{}Vector device=\"{}\" name=\"{}\" label=\"{}\" perm=\"{}\" state=\"{}\">\n",
        verb,
        kind,
        escape(device),
        escape(name),
        escape(label),
        perm,
        state
    )
}

fn close_vector_tag(kind: &str, verb: &str) -> String {
    format!("</{}{}Vector>\n", verb, kind)
}

// ---- Text ----------------------------------------------------------

fn render_text(verb: &str, vector: &TextVector, message: Option<&str>) -> String {
    let mut out = open_vector_tag(
        "Text",
        verb,
        vector.device.as_str(),
        vector.name.as_str(),
        &vector.label,
        vector.permission,
        vector.state,
    );
    for m in &vector.members {
        out.push_str(&format!(
            "    <one{}Text name=\"{}\" label=\"{}\">{}</one{}Text>\n",
            verb,
            escape(&m.name),
            escape(&m.label),
            escape(&m.value),
            verb
        ));
    }
    out.push_str(&message_child(message));
    out.push_str(&close_vector_tag("Text", verb));
    out
}

pub fn define_text(
    sink: &dyn ByteSink,
    registry: &PropertyRegistry,
    handle: &Arc<Mutex<TextVector>>,
    message: Option<&str>,
) -> io::Result<()> {
    let vector = handle.lock().expect("vector mutex poisoned");
    let key = Key::new(vector.device.clone(), vector.name.clone());
    registry.register_unique(key, Handle::Text(Arc::clone(handle)));
    sink.emit(render_text("def", &vector, message).as_bytes())
}

pub fn set_text(sink: &dyn ByteSink, vector: &TextVector, message: Option<&str>) -> io::Result<()> {
    sink.emit(render_text("set", vector, message).as_bytes())
}

// ---- Number ---------------------------------------------------------

/// Renders a member's value per its `numberFormat`-style `format`
/// string: a trailing `m` conversion means sexagesimal (`D:M:S`), with
/// the digit after the decimal point giving the number of fraction
/// digits; anything else (`%f`, `%g`, `%e`, ...) is a plain C-locale
/// decimal, with that same digit giving the fraction digits (default
/// six, printf's default for `%f`).
fn format_value(value: f64, format: &str) -> String {
    let precision = format
        .rsplit('.')
        .next()
        .and_then(|s| s.trim_end_matches(|c: char| c.is_alphabetic()).parse::<usize>().ok());

    if format.trim_end().ends_with('m') {
        sexagesimal::format(value, precision.unwrap_or(6))
    } else {
        format!("{:.*}", precision.unwrap_or(6), value)
    }
}

fn render_number(verb: &str, vector: &NumberVector, message: Option<&str>) -> String {
    let mut out = open_vector_tag(
        "Number",
        verb,
        vector.device.as_str(),
        vector.name.as_str(),
        &vector.label,
        vector.permission,
        vector.state,
    );
    for m in &vector.members {
        let rendered = format_value(m.value, &m.format);
        out.push_str(&format!(
            "    <one{}Number name=\"{}\" label=\"{}\" format=\"{}\" min=\"{}\" max=\"{}\" step=\"{}\">{}</one{}Number>\n",
            verb,
            escape(&m.name),
            escape(&m.label),
            escape(&m.format),
            m.min,
            m.max,
            m.step,
            rendered,
            verb
        ));
    }
    out.push_str(&message_child(message));
    out.push_str(&close_vector_tag("Number", verb));
    out
}

pub fn define_number(
    sink: &dyn ByteSink,
    registry: &PropertyRegistry,
    handle: &Arc<Mutex<NumberVector>>,
    message: Option<&str>,
) -> io::Result<()> {
    let vector = handle.lock().expect("vector mutex poisoned");
    let key = Key::new(vector.device.clone(), vector.name.clone());
    registry.register_unique(key, Handle::Number(Arc::clone(handle)));
    sink.emit(render_number("def", &vector, message).as_bytes())
}

pub fn set_number(sink: &dyn ByteSink, vector: &NumberVector, message: Option<&str>) -> io::Result<()> {
    sink.emit(render_number("set", vector, message).as_bytes())
}

// ---- Switch ----------------------------------------------------------

fn render_switch(verb: &str, vector: &SwitchVector, message: Option<&str>) -> String {
    let rule = match vector.rule {
        SwitchRule::AnyOfMany => "AnyOfMany",
        SwitchRule::AtMostOne => "AtMostOne",
        SwitchRule::OneOfMany => "OneOfMany",
    };
    let mut out = format!(
        "<{}SwitchVector device=\"{}\" name=\"{}\" label=\"{}\" perm=\"{}\" rule=\"{}\" state=\"{}\">\n",
        verb,
        escape(vector.device.as_str()),
        escape(vector.name.as_str()),
        escape(&vector.label),
        vector.permission,
        rule,
        vector.state
    );
    for m in &vector.members {
        out.push_str(&format!(
            "    <one{}Switch name=\"{}\" label=\"{}\">{}</one{}Switch>\n",
            verb,
            escape(&m.name),
            escape(&m.label),
            m.state,
            verb
        ));
    }
    out.push_str(&message_child(message));
    out.push_str(&close_vector_tag("Switch", verb));
    out
}

pub fn define_switch(
    sink: &dyn ByteSink,
    registry: &PropertyRegistry,
    handle: &Arc<Mutex<SwitchVector>>,
    message: Option<&str>,
) -> io::Result<()> {
    let vector = handle.lock().expect("vector mutex poisoned");
    let key = Key::new(vector.device.clone(), vector.name.clone());
    registry.register_unique(key, Handle::Switch(Arc::clone(handle)));
    sink.emit(render_switch("def", &vector, message).as_bytes())
}

pub fn set_switch(sink: &dyn ByteSink, vector: &SwitchVector, message: Option<&str>) -> io::Result<()> {
    sink.emit(render_switch("set", vector, message).as_bytes())
}

// ---- Light -------------------------------------------------------------

fn render_light(verb: &str, vector: &LightVector, message: Option<&str>) -> String {
    let mut out = format!(
        "<{}LightVector device=\"{}\" name=\"{}\" label=\"{}\" state=\"{}\">\n",
        verb,
        escape(vector.device.as_str()),
        escape(vector.name.as_str()),
        escape(&vector.label),
        vector.state
    );
    for m in &vector.members {
        out.push_str(&format!(
            "    <one{}Light name=\"{}\" label=\"{}\">{}</one{}Light>\n",
            verb,
            escape(&m.name),
            escape(&m.label),
            m.state,
            verb
        ));
    }
    out.push_str(&message_child(message));
    out.push_str(&close_vector_tag("Light", verb));
    out
}

pub fn define_light(sink: &dyn ByteSink, vector: &LightVector, message: Option<&str>) -> io::Result<()> {
    sink.emit(render_light("def", vector, message).as_bytes())
}

pub fn set_light(sink: &dyn ByteSink, vector: &LightVector, message: Option<&str>) -> io::Result<()> {
    sink.emit(render_light("set", vector, message).as_bytes())
}

// ---- BLOB ---------------------------------------------------------------

fn render_blob(verb: &str, vector: &BlobVector, message: Option<&str>) -> String {
    let mut out = open_vector_tag(
        "BLOB",
        verb,
        vector.device.as_str(),
        vector.name.as_str(),
        &vector.label,
        vector.permission,
        vector.state,
    );
    for m in &vector.members {
        let encoded = crate::base64::encode(&m.bytes);
        out.push_str(&format!(
            "    <one{}BLOB name=\"{}\" label=\"{}\" size=\"{}\" enclen=\"{}\" format=\"{}\">{}</one{}BLOB>\n",
            verb,
            escape(&m.name),
            escape(&m.label),
            m.size,
            encoded.len(),
            escape(&m.format),
            encoded,
            verb
        ));
    }
    out.push_str(&message_child(message));
    out.push_str(&close_vector_tag("BLOB", verb));
    out
}

pub fn define_blob(
    sink: &dyn ByteSink,
    registry: &PropertyRegistry,
    handle: &Arc<Mutex<BlobVector>>,
    message: Option<&str>,
) -> io::Result<()> {
    let vector = handle.lock().expect("vector mutex poisoned");
    let key = Key::new(vector.device.clone(), vector.name.clone());
    registry.register_unique(key, Handle::Blob(Arc::clone(handle)));
    sink.emit(render_blob("def", &vector, message).as_bytes())
}

/// Renders (but does not emit) a `setBLOBVector` fragment. Exposed
/// separately from `set_blob` so `BlobFlowControl` can append the
/// `pingRequest` element to the same buffer before handing it to the
/// sink as one atomic write.
pub(crate) fn render_set_blob(vector: &BlobVector, message: Option<&str>) -> String {
    render_blob("set", vector, message)
}

pub fn set_blob(sink: &dyn ByteSink, vector: &BlobVector, message: Option<&str>) -> io::Result<()> {
    sink.emit(render_set_blob(vector, message).as_bytes())
}

// ---- Delete / message / snoop -------------------------------------------

pub fn delete(
    sink: &dyn ByteSink,
    device: &Device,
    name: Option<&Property>,
    message: Option<&str>,
) -> io::Result<()> {
    let mut out = String::new();
    match name {
        Some(name) => out.push_str(&format!(
            "<delProperty device=\"{}\" name=\"{}\">\n",
            escape(device.as_str()),
            escape(name.as_str())
        )),
        None => out.push_str(&format!("<delProperty device=\"{}\">\n", escape(device.as_str()))),
    }
    out.push_str(&message_child(message));
    out.push_str("</delProperty>\n");
    sink.emit(out.as_bytes())
}

pub fn message(sink: &dyn ByteSink, device: &Device, text: &str) -> io::Result<()> {
    let out = format!(
        "<message device=\"{}\" message=\"{}\"/>\n",
        escape(device.as_str()),
        escape(text)
    );
    sink.emit(out.as_bytes())
}

/// Subscribes to another driver's property updates. `Device` is a
/// validated newtype that can never hold an empty string, so every
/// call here targets a real device.
pub fn snoop_device(sink: &dyn ByteSink, device: &Device, property: Option<&Property>) -> io::Result<()> {
    let out = match property {
        Some(p) => format!(
            "<getProperties version=\"1.7\" device=\"{}\" name=\"{}\"/>\n",
            escape(device.as_str()),
            escape(p.as_str())
        ),
        None => format!(
            "<getProperties version=\"1.7\" device=\"{}\"/>\n",
            escape(device.as_str())
        ),
    };
    sink.emit(out.as_bytes())
}

pub fn snoop_blobs(
    sink: &dyn ByteSink,
    device: &Device,
    property: &Property,
    handling: BlobHandling,
) -> io::Result<()> {
    let out = format!(
        "<enableBLOB device=\"{}\" name=\"{}\">{}</enableBLOB>\n",
        escape(device.as_str()),
        escape(property.as_str()),
        handling
    );
    sink.emit(out.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{NumberMember, SwitchMember};
    use crate::sink::StreamSink;

    fn dev(s: &str) -> Device {
        Device::new(s).unwrap()
    }

    fn prop(s: &str) -> Property {
        Property::new(s).unwrap()
    }

    #[test]
    fn define_number_registers_and_emits() {
        let sink = StreamSink::new(Vec::<u8>::new());
        let registry = PropertyRegistry::new();
        let vector = NumberVector::new(
            dev("Mount"),
            prop("TIME"),
            "Time",
            Permission::ReadOnly,
            vec![NumberMember::new("UTC", "UTC", "%f", 0.0, 24.0, 0.0, 12.0)],
        );
        let handle = Arc::new(Mutex::new(vector));
        define_number(&sink, &registry, &handle, Some("hello")).unwrap();

        let key = Key::new(dev("Mount"), prop("TIME"));
        assert!(registry.contains(&key));
    }

    #[test]
    fn delete_without_name_targets_whole_device() {
        let sink = StreamSink::new(Vec::<u8>::new());
        delete(&sink, &dev("Mount"), None, None).unwrap();
    }

    #[test]
    fn snoop_device_emits_for_a_targeted_property() {
        let sink = StreamSink::new(Vec::<u8>::new());
        snoop_device(&sink, &dev("Dome"), Some(&prop("SHUTTER"))).unwrap();
    }

    #[test]
    fn snoop_device_emits_for_a_whole_device() {
        let sink = StreamSink::new(Vec::<u8>::new());
        snoop_device(&sink, &dev("Dome"), None).unwrap();
    }

    #[test]
    fn switch_render_contains_rule_and_states() {
        let vector = SwitchVector::new(
            dev("Mount"),
            prop("SLEW"),
            "Slew",
            Permission::ReadWrite,
            SwitchRule::OneOfMany,
            vec![
                SwitchMember::new("FAST", "Fast", SwitchState::On),
                SwitchMember::new("SLOW", "Slow", SwitchState::Off),
            ],
        );
        let rendered = render_switch("def", &vector, None);
        assert!(rendered.contains("rule=\"OneOfMany\""));
        assert!(rendered.contains(">On<"));
        assert!(rendered.contains(">Off<"));
    }

    #[test]
    fn number_with_decimal_format_renders_decimal() {
        assert_eq!(format_value(15.5, "%.2f"), "15.50");
        assert_eq!(format_value(-3.0, "%5.1g"), "-3.0");
    }

    #[test]
    fn number_with_sexagesimal_format_renders_sexagesimal() {
        assert_eq!(format_value(12.5, "%10.6m"), "12:30:00.000000");
    }

    #[test]
    fn render_number_honors_each_members_format() {
        let vector = NumberVector::new(
            dev("Mount"),
            prop("COORDS"),
            "Coords",
            Permission::ReadOnly,
            vec![
                NumberMember::new("RA", "RA", "%10.6m", 0.0, 24.0, 0.0, 12.5),
                NumberMember::new("DEC", "Dec", "%.2f", -90.0, 90.0, 0.0, 45.25),
            ],
        );
        let rendered = render_number("def", &vector, None);
        assert!(rendered.contains(">12:30:00.000000<"));
        assert!(rendered.contains(">45.25<"));
    }
}
