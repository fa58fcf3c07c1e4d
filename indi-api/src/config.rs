//! Per-device configuration file persistence.
//!
//! Grounded on `IUGetConfigFP`/`IUReadConfig`/`IUSaveDefaultConfig`/
//! `IUPurgeConfig`/`IUGetConfigNumber`/`IUGetConfigText`/
//! `IUGetConfigSwitch`/`IUGetConfigOnSwitchIndex`/
//! `IUGetConfigOnSwitchName` in `indidriver.c`. File location
//! precedence, the root-ownership safety check, and the diagnostic
//! wording are all taken from there; the `nPropCache`-style raw
//! element search is reused for the typed lookups since they only
//! need to read a single member value out of the file, not run it
//! through the dispatcher.

use crate::context::DriverContext;
use crate::dispatch::{self, Handlers};
use crate::emit::escape;
use crate::property::{NumberVector, SwitchState, SwitchVector, TextVector};
use crate::sexagesimal;
use crate::sink::ByteSink;
use crate::types::name::{Device, Property};
use crate::types::{Error, Result};
use crate::xml::{read_element, Element};
use std::fs;
use std::io::{self, BufReader};
use std::os::unix::fs::{DirBuilderExt, MetadataExt};
use std::path::{Path, PathBuf};

const CONFIG_DIR_MODE: u32 = 0o750;

fn home_config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::ConfigIo("cannot determine home directory".into()))?;
    Ok(home.join(".indi"))
}

fn ensure_config_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        return Ok(());
    }
    fs::DirBuilder::new()
        .mode(CONFIG_DIR_MODE)
        .create(dir)
        .map_err(|e| Error::ConfigIo(format!("Unable to create config directory. Error {}: {}", dir.display(), e)))
}

/// Resolves the config file path for `device`, honoring the
/// precedence order: explicit `filename`, then `INDICONFIG`, then
/// `<HOME>/.indi/<device>_config.xml`.
pub fn resolve_path(filename: Option<&Path>, device: &Device) -> Result<PathBuf> {
    if let Some(f) = filename {
        return Ok(f.to_path_buf());
    }
    if let Ok(path) = std::env::var("INDICONFIG") {
        return Ok(PathBuf::from(path));
    }
    let dir = home_config_dir()?;
    Ok(dir.join(format!("{}_config.xml", device.as_str())))
}

fn resolve_default_path(filename: Option<&Path>, device: &Device) -> Result<PathBuf> {
    if let Some(f) = filename {
        return Ok(f.to_path_buf());
    }
    if let Ok(path) = std::env::var("INDICONFIG") {
        return Ok(PathBuf::from(format!("{}.default", path)));
    }
    let dir = home_config_dir()?;
    Ok(dir.join(format!("{}_config.xml.default", device.as_str())))
}

/// Fails if `path` is owned by root while the current process is not,
/// with a "run sudo chown -R $USER:$USER ~/.indi" diagnostic -- this
/// guards against a driver launched once as root locking a user out
/// of their own config file afterward.
fn check_ownership(path: &Path) -> Result<()> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(_) => return Ok(()), // file doesn't exist yet; nothing to check
    };
    let uid = meta.uid();
    let gid = meta.gid();
    let my_uid = nix::unistd::getuid();
    let my_gid = nix::unistd::getgid();
    if (uid == 0 && !my_uid.is_root()) || (gid == 0 && my_gid.as_raw() != 0) {
        return Err(Error::ConfigIo(
            "Config file is owned by root! This will lead to serious errors. To fix this, run: sudo chown -R $USER:$USER ~/.indi".into(),
        ));
    }
    Ok(())
}

fn open_for_read(filename: Option<&Path>, device: &Device) -> Result<fs::File> {
    let dir = home_config_dir()?;
    ensure_config_dir(&dir)?;
    let path = resolve_path(filename, device)?;
    check_ownership(&path)?;
    fs::File::open(&path)
        .map_err(|e| Error::ConfigIo(format!("Unable to open config file. Error loading file {}: {}", path.display(), e)))
}

fn parse_elements(file: fs::File) -> Result<Vec<Element>> {
    let mut reader = quick_xml::reader::Reader::from_reader(BufReader::new(file));
    reader.config_mut().trim_text(true);
    let mut elements = Vec::new();
    while let Some(element) = read_element(&mut reader)? {
        elements.push(element);
    }
    Ok(elements)
}

fn find_property<'a>(elements: &'a [Element], device: &Device, property: &Property) -> Option<&'a Element> {
    elements.iter().find(|e| {
        e.attr("device") == Some(device.as_str()) && e.attr("name") == Some(property.as_str())
    })
}

/// Parses the config file for `device` and feeds each top-level
/// element belonging to it through the dispatcher, optionally
/// restricted to a single `property` (stopping after the first
/// match). Emits `[INFO]` progress messages unless `silent`.
pub fn load_and_apply(
    ctx: &DriverContext,
    handlers: &dyn Handlers,
    filename: Option<&Path>,
    device: &Device,
    property: Option<&Property>,
    silent: bool,
) -> Result<()> {
    let file = open_for_read(filename, device)?;
    let elements = parse_elements(file)?;

    if !elements.is_empty() && !silent {
        let _ = crate::emit::message(ctx.sink.as_ref(), device, "[INFO] Loading device configuration...");
    }

    for element in &elements {
        if element.attr("device") != Some(device.as_str()) {
            continue;
        }
        let matches_property = match property {
            Some(p) => element.attr("name") == Some(p.as_str()),
            None => true,
        };
        if !matches_property {
            continue;
        }
        match dispatch::dispatch(ctx, handlers, element) {
            Ok(_) => {}
            Err(e) => return Err(e),
        }
        if property.is_some() {
            break;
        }
    }

    if !elements.is_empty() && !silent {
        let _ = crate::emit::message(ctx.sink.as_ref(), device, "[INFO] Device configuration applied.");
    }
    Ok(())
}

/// Copies `source` to `dest` only if `dest` doesn't already exist. A
/// pre-existing default is left untouched, matching
/// `IUSaveDefaultConfig`'s "no need to modify it" short-circuit.
pub fn save_as_default(source: Option<&Path>, dest: Option<&Path>, device: &Device) -> Result<()> {
    let source_path = resolve_path(source, device)?;
    let dest_path = resolve_default_path(dest, device)?;

    if dest_path.exists() {
        return Ok(());
    }

    fs::copy(&source_path, &dest_path)
        .map(|_| ())
        .map_err(|e| Error::ConfigIo(format!("Unable to save default config: {}", e)))
}

pub fn purge(filename: Option<&Path>, device: &Device) -> Result<()> {
    let path = resolve_path(filename, device)?;
    fs::remove_file(&path)
        .map_err(|e| Error::ConfigIo(format!("Unable to purge configuration file {}. Error {}", path.display(), e)))
}

fn member_text<'a>(element: &'a Element, family_tag_suffix: &str, member: &str) -> Option<&'a str> {
    let one_tag = format!("one{}", family_tag_suffix);
    element
        .children
        .iter()
        .find(|c| c.tag == one_tag && c.attr("name") == Some(member))
        .map(|c| c.text_trimmed())
}

pub fn get_number(device: &Device, property: &Property, member: &str) -> Result<f64> {
    let file = open_for_read(None, device)?;
    let elements = parse_elements(file)?;
    let element = find_property(&elements, device, property)
        .ok_or_else(|| Error::NotFound)?;
    let text = member_text(element, "Number", member).ok_or(Error::NotFound)?;
    crate::sexagesimal::parse(text)
}

/// Returns the raw text value of `member` as an owned, always-valid
/// `String` -- there is no fixed-size buffer to overflow here, unlike
/// a `strncpy`-into-caller-buffer C API.
pub fn get_text(device: &Device, property: &Property, member: &str) -> Result<String> {
    let file = open_for_read(None, device)?;
    let elements = parse_elements(file)?;
    let element = find_property(&elements, device, property).ok_or(Error::NotFound)?;
    member_text(element, "Text", member)
        .map(str::to_string)
        .ok_or(Error::NotFound)
}

pub fn get_switch(device: &Device, property: &Property, member: &str) -> Result<SwitchState> {
    let file = open_for_read(None, device)?;
    let elements = parse_elements(file)?;
    let element = find_property(&elements, device, property).ok_or(Error::NotFound)?;
    let text = member_text(element, "Switch", member).ok_or(Error::NotFound)?;
    if text.starts_with("On") {
        Ok(SwitchState::On)
    } else if text == "Off" {
        Ok(SwitchState::Off)
    } else {
        Err(Error::BadFormat(format!("not a switch state: {}", text)))
    }
}

pub fn get_on_switch_index(device: &Device, property: &Property) -> Result<usize> {
    let file = open_for_read(None, device)?;
    let elements = parse_elements(file)?;
    let element = find_property(&elements, device, property).ok_or(Error::NotFound)?;
    element
        .children
        .iter()
        .filter(|c| c.tag == "oneSwitch")
        .position(|c| c.text_trimmed().starts_with("On"))
        .ok_or(Error::NotFound)
}

pub fn get_on_switch_name(device: &Device, property: &Property) -> Result<String> {
    let file = open_for_read(None, device)?;
    let elements = parse_elements(file)?;
    let element = find_property(&elements, device, property).ok_or(Error::NotFound)?;
    element
        .children
        .iter()
        .filter(|c| c.tag == "oneSwitch")
        .find(|c| c.text_trimmed().starts_with("On"))
        .and_then(|c| c.attr("name"))
        .map(str::to_string)
        .ok_or(Error::NotFound)
}

/// Writes the opening or closing bracket of a config-save session
/// (`ctag` 0 for open, 1 for close), emitting the matching `[INFO]`
/// message unless `silent`. The driver is responsible for writing the
/// tracked properties' `set*Vector` elements between the two calls.
pub fn save_config_tag(ctx: &DriverContext, device: &Device, ctag: u8, silent: bool) -> std::io::Result<()> {
    let fragment = if ctag == 0 { "<newXMLVector>\n" } else { "</newXMLVector>\n" };
    ctx.sink.emit(fragment.as_bytes())?;
    if !silent {
        let text = if ctag == 0 {
            "[INFO] Saving device configuration..."
        } else {
            "[INFO] Device configuration saved."
        };
        let _ = crate::emit::message(ctx.sink.as_ref(), device, text);
    }
    Ok(())
}

/// Writes the current values of `vector` as a `newNumberVector`
/// element, for use between a `save_config_tag(ctx, device, 0, _)` /
/// `save_config_tag(ctx, device, 1, _)` pair. Grounded on
/// `IUSaveConfigNumber`.
pub fn save_number(sink: &dyn ByteSink, vector: &NumberVector) -> io::Result<()> {
    let mut out = format!(
        "  <newNumberVector device=\"{}\" name=\"{}\">\n",
        escape(vector.device.as_str()),
        escape(vector.name.as_str())
    );
    for m in &vector.members {
        out.push_str(&format!(
            "    <oneNumber name=\"{}\">{}</oneNumber>\n",
            escape(&m.name),
            sexagesimal::format(m.value, 6)
        ));
    }
    out.push_str("  </newNumberVector>\n");
    sink.emit(out.as_bytes())
}

/// Writes the current values of `vector` as a `newTextVector` element.
/// Grounded on `IUSaveConfigText`.
pub fn save_text(sink: &dyn ByteSink, vector: &TextVector) -> io::Result<()> {
    let mut out = format!(
        "  <newTextVector device=\"{}\" name=\"{}\">\n",
        escape(vector.device.as_str()),
        escape(vector.name.as_str())
    );
    for m in &vector.members {
        out.push_str(&format!(
            "    <oneText name=\"{}\">{}</oneText>\n",
            escape(&m.name),
            escape(&m.value)
        ));
    }
    out.push_str("  </newTextVector>\n");
    sink.emit(out.as_bytes())
}

/// Writes the current values of `vector` as a `newSwitchVector`
/// element. Grounded on `IUSaveConfigSwitch`.
pub fn save_switch(sink: &dyn ByteSink, vector: &SwitchVector) -> io::Result<()> {
    let mut out = format!(
        "  <newSwitchVector device=\"{}\" name=\"{}\">\n",
        escape(vector.device.as_str()),
        escape(vector.name.as_str())
    );
    for m in &vector.members {
        out.push_str(&format!(
            "    <oneSwitch name=\"{}\">{}</oneSwitch>\n",
            escape(&m.name),
            m.state
        ));
    }
    out.push_str("  </newSwitchVector>\n");
    sink.emit(out.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_path_honors_explicit_filename() {
        let device = Device::new("Mount").unwrap();
        let path = resolve_path(Some(Path::new("/tmp/custom.xml")), &device).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom.xml"));
    }

    #[test]
    fn resolve_path_honors_indiconfig_env() {
        let device = Device::new("Mount").unwrap();
        std::env::set_var("INDICONFIG", "/tmp/envconfig.xml");
        let path = resolve_path(None, &device).unwrap();
        std::env::remove_var("INDICONFIG");
        assert_eq!(path, PathBuf::from("/tmp/envconfig.xml"));
    }

    #[test]
    fn member_text_finds_named_member() {
        let mut vector = Element::new("defNumberVector");
        let mut member = Element::new("oneNumber");
        member.attrs.insert("name".into(), "UTC".into());
        member.text = "12.5".into();
        vector.children.push(member);

        assert_eq!(member_text(&vector, "Number", "UTC"), Some("12.5"));
        assert_eq!(member_text(&vector, "Number", "MISSING"), None);
    }
}
