//! End-to-end scenarios exercising the dispatcher, registry, config
//! persistence, and BLOB flow control together, the way a real driver
//! process would use them rather than in isolation.

use indi_api::property::{
    BlobVector, NumberMember, NumberVector, Permission, SwitchMember, SwitchRule, SwitchState,
    SwitchVector,
};
use indi_api::sink::ByteSink;
use indi_api::types::name::{Device, Key, Property};
use indi_api::types::Error;
use indi_api::update::{self, BlobUpdate};
use indi_api::xml::Element;
use indi_api::{config, dispatch, emit, DriverContext, Handlers};
use std::sync::{Arc, Mutex};

/// A `ByteSink` that keeps every emitted fragment so a test can
/// inspect exactly what went out over the wire.
struct RecordingSink(Mutex<Vec<u8>>);

impl RecordingSink {
    fn new() -> Self {
        RecordingSink(Mutex::new(Vec::new()))
    }

    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl ByteSink for RecordingSink {
    fn emit(&self, fragment: &[u8]) -> std::io::Result<()> {
        self.0.lock().unwrap().extend_from_slice(fragment);
        Ok(())
    }
}

fn parse(xml: &str) -> Element {
    let mut reader = quick_xml::reader::Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    indi_api::xml::read_element(&mut reader).unwrap().unwrap()
}

fn context() -> (DriverContext, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let ctx = DriverContext::new(Arc::clone(&sink) as Arc<dyn ByteSink>);
    (ctx, sink)
}

struct NullHandlers;

impl Handlers for NullHandlers {
    fn broadcast_properties(&self, _ctx: &DriverContext, _device: Option<&Device>) {}
    fn snoop(&self, _ctx: &DriverContext, _element: &Element) {}
    fn new_number(&self, _ctx: &DriverContext, _key: &Key, _values: Vec<(String, f64)>) {}
    fn new_switch(&self, _ctx: &DriverContext, _key: &Key, _values: Vec<(String, SwitchState)>) {}
    fn new_text(&self, _ctx: &DriverContext, _key: &Key, _values: Vec<(String, String)>) {}
    fn new_blob(&self, _ctx: &DriverContext, _key: &Key, _values: Vec<BlobUpdate>) {}
}

/// A driver stand-in that, on `new_number`/`new_switch`/`new_blob`,
/// runs the matching `update::*` helper over a property it owns and
/// re-emits the result -- enough behavior to exercise the dispatcher's
/// authorization and decoding against something other than a no-op.
struct EchoDriver {
    number: Option<Arc<Mutex<NumberVector>>>,
    switch: Option<Arc<Mutex<SwitchVector>>>,
    blob: Option<Arc<Mutex<BlobVector>>>,
}

impl EchoDriver {
    fn new() -> Self {
        EchoDriver {
            number: None,
            switch: None,
            blob: None,
        }
    }
}

impl Handlers for EchoDriver {
    fn broadcast_properties(&self, _ctx: &DriverContext, _device: Option<&Device>) {}
    fn snoop(&self, _ctx: &DriverContext, _element: &Element) {}

    fn new_number(&self, ctx: &DriverContext, _key: &Key, values: Vec<(String, f64)>) {
        let Some(handle) = &self.number else { return };
        let pairs: Vec<(&str, f64)> = values.iter().map(|(n, v)| (n.as_str(), *v)).collect();
        let mut vector = handle.lock().unwrap();
        if update::update_number(&mut vector, &pairs).is_ok() {
            let _ = emit::set_number(ctx.sink.as_ref(), &vector, None);
        }
    }

    fn new_switch(&self, ctx: &DriverContext, _key: &Key, values: Vec<(String, SwitchState)>) {
        let Some(handle) = &self.switch else { return };
        let pairs: Vec<(&str, SwitchState)> = values.iter().map(|(n, v)| (n.as_str(), *v)).collect();
        let mut vector = handle.lock().unwrap();
        if update::update_switch(&mut vector, &pairs).is_ok() {
            let _ = emit::set_switch(ctx.sink.as_ref(), &vector, None);
        }
    }

    fn new_text(&self, _ctx: &DriverContext, _key: &Key, _values: Vec<(String, String)>) {}

    fn new_blob(&self, ctx: &DriverContext, _key: &Key, values: Vec<BlobUpdate>) {
        let Some(handle) = &self.blob else { return };
        let mut vector = handle.lock().unwrap();
        if update::update_blob(&mut vector, values).is_ok() {
            let _ = ctx.blobs.emit(ctx.sink.as_ref(), &vector, None);
        }
    }
}

#[test]
fn version_gate_rejects_a_client_ahead_of_the_compiled_protocol() {
    let (ctx, _sink) = context();
    let handlers = NullHandlers;
    let element = parse(r#"<getProperties version="99.0"/>"#);
    let err = dispatch::dispatch(&ctx, &handlers, &element).unwrap_err();
    assert!(matches!(err, Error::Fatal(_)));
}

#[test]
fn defining_a_readonly_property_then_rejects_a_client_write() {
    let (ctx, _sink) = context();
    let device = Device::new("Weather").unwrap();
    let property = Property::new("PRESSURE").unwrap();
    let vector = NumberVector::new(
        device,
        property,
        "Pressure",
        Permission::ReadOnly,
        vec![NumberMember::new("HPA", "hPa", "%.1f", 900.0, 1100.0, 0.0, 1013.0)],
    );
    let handle = Arc::new(Mutex::new(vector));
    emit::define_number(ctx.sink.as_ref(), &ctx.registry, &handle, None).unwrap();

    let handlers = NullHandlers;
    let element = parse(
        r#"<newNumberVector device="Weather" name="PRESSURE"><oneNumber name="HPA">1000</oneNumber></newNumberVector>"#,
    );
    let err = dispatch::dispatch(&ctx, &handlers, &element).unwrap_err();
    assert_eq!(err.to_string(), "Cannot set read-only property PRESSURE");
    assert_eq!(handle.lock().unwrap().find("HPA").unwrap().value, 1013.0);
}

#[test]
fn number_update_rejects_the_whole_request_atomically_on_range_violation() {
    let (ctx, _sink) = context();
    let device = Device::new("Mount").unwrap();
    let property = Property::new("COORDS").unwrap();
    let vector = NumberVector::new(
        device,
        property,
        "Coords",
        Permission::ReadWrite,
        vec![
            NumberMember::new("RA", "RA", "%f", 0.0, 24.0, 0.0, 0.0),
            NumberMember::new("DEC", "Dec", "%f", -90.0, 90.0, 0.0, 0.0),
        ],
    );
    let handle = Arc::new(Mutex::new(vector));
    emit::define_number(ctx.sink.as_ref(), &ctx.registry, &handle, None).unwrap();

    let mut driver = EchoDriver::new();
    driver.number = Some(Arc::clone(&handle));

    let element = parse(
        r#"<newNumberVector device="Mount" name="COORDS"><oneNumber name="RA">5</oneNumber><oneNumber name="DEC">999</oneNumber></newNumberVector>"#,
    );
    dispatch::dispatch(&ctx, &driver, &element).unwrap();

    let vector = handle.lock().unwrap();
    assert_eq!(vector.find("RA").unwrap().value, 0.0);
    assert_eq!(vector.find("DEC").unwrap().value, 0.0);
}

#[test]
fn switch_one_of_many_round_trips_through_a_config_file() {
    let (ctx, _sink) = context();
    let device = Device::new("Filter Wheel").unwrap();
    let property = Property::new("FILTER_SLOT").unwrap();
    let vector = SwitchVector::new(
        device.clone(),
        property,
        "Filter",
        Permission::ReadWrite,
        SwitchRule::OneOfMany,
        vec![
            SwitchMember::new("RED", "Red", SwitchState::On),
            SwitchMember::new("BLUE", "Blue", SwitchState::Off),
        ],
    );
    let handle = Arc::new(Mutex::new(vector));
    emit::define_switch(ctx.sink.as_ref(), &ctx.registry, &handle, None).unwrap();

    let mut driver = EchoDriver::new();
    driver.switch = Some(Arc::clone(&handle));

    let path = std::env::temp_dir().join(format!(
        "indi-api-scenario-{}-filter.xml",
        std::process::id()
    ));
    std::fs::write(
        &path,
        r#"<newSwitchVector device="Filter Wheel" name="FILTER_SLOT"><oneSwitch name="RED">Off</oneSwitch><oneSwitch name="BLUE">On</oneSwitch></newSwitchVector>"#,
    )
    .unwrap();

    let result = config::load_and_apply(&ctx, &driver, Some(path.as_path()), &device, None, true);
    std::fs::remove_file(&path).ok();
    result.unwrap();

    assert_eq!(handle.lock().unwrap().on_name(), Some("BLUE"));
}

#[test]
fn blob_payload_round_trips_base64_with_a_matching_enclen() {
    let (ctx, sink) = context();
    let device = Device::new("Camera").unwrap();
    let property = Property::new("CCD1").unwrap();
    let vector = BlobVector::new(
        device,
        property,
        "Image",
        Permission::ReadWrite,
        vec![indi_api::property::BlobMember::new("IMAGE", "Image")],
    );
    let handle = Arc::new(Mutex::new(vector));
    emit::define_blob(ctx.sink.as_ref(), &ctx.registry, &handle, None).unwrap();

    let mut driver = EchoDriver::new();
    driver.blob = Some(Arc::clone(&handle));

    let payload = b"some raw bytes\x00\x01\x02".to_vec();
    let encoded = indi_api::base64::encode(&payload);
    let xml = format!(
        r#"<newBLOBVector device="Camera" name="CCD1"><oneBLOB name="IMAGE" format=".raw" size="{}">{}</oneBLOB></newBLOBVector>"#,
        payload.len(),
        encoded
    );
    dispatch::dispatch(&ctx, &driver, &parse(&xml)).unwrap();

    assert_eq!(handle.lock().unwrap().find("IMAGE").unwrap().bytes, payload);

    let wire = sink.contents();
    let expected_enclen = format!("enclen=\"{}\"", encoded.len());
    assert!(
        wire.contains(&expected_enclen),
        "expected {} in emitted setBLOBVector, got: {}",
        expected_enclen,
        wire
    );
}

#[test]
fn blob_flow_control_serializes_emission_until_the_ping_is_acked() {
    let (ctx, sink) = context();
    let device = Device::new("Camera").unwrap();
    let property = Property::new("CCD1").unwrap();
    let vector = BlobVector::new(
        device,
        property,
        "Image",
        Permission::ReadOnly,
        vec![indi_api::property::BlobMember::new("IMAGE", "Image")],
    );

    ctx.blobs.emit(ctx.sink.as_ref(), &vector, None).unwrap();
    assert!(sink.contents().contains("pingRequest identifier=\"SetBLOB/1\""));

    let ctx = Arc::new(ctx);
    let ctx2 = Arc::clone(&ctx);
    let vector2 = vector.clone();
    let handle = std::thread::spawn(move || {
        ctx2.blobs.emit(ctx2.sink.as_ref(), &vector2, None).unwrap();
    });

    std::thread::sleep(std::time::Duration::from_millis(50));
    assert!(!handle.is_finished());

    ctx.blobs.ack("SetBLOB/1");
    handle.join().unwrap();
    assert!(sink.contents().contains("pingRequest identifier=\"SetBLOB/2\""));
}
