//! OVF 1.0 descriptor generation.
//!
//! The descriptor records the VM's identity and virtual hardware (CPU and
//! memory). Disk images are not part of the export.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::{VCenterError, VCenterResult};
use crate::types::VmInfo;

const OVF_NS: &str = "http://schemas.dmtf.org/ovf/envelope/1";
const RASD_NS: &str =
    "http://schemas.dmtf.org/wbem/wscim/1/cim-schema/2/CIM_ResourceAllocationSettingData";
const VSSD_NS: &str =
    "http://schemas.dmtf.org/wbem/wscim/1/cim-schema/2/CIM_VirtualSystemSettingData";

// CIM resource types.
const RESOURCE_CPU: &str = "3";
const RESOURCE_MEMORY: &str = "4";

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn xml_err(e: impl std::fmt::Display) -> VCenterError {
    VCenterError::io(format!("Failed to write OVF descriptor: {}", e))
}

fn start(writer: &mut XmlWriter, elem: BytesStart<'_>) -> VCenterResult<()> {
    writer.write_event(Event::Start(elem)).map_err(xml_err)
}

fn end(writer: &mut XmlWriter, name: &str) -> VCenterResult<()> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)
}

fn text_element(writer: &mut XmlWriter, name: &str, text: &str) -> VCenterResult<()> {
    start(writer, BytesStart::new(name))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_err)?;
    end(writer, name)
}

fn hardware_item(
    writer: &mut XmlWriter,
    instance_id: &str,
    resource_type: &str,
    allocation_units: &str,
    element_name: &str,
    quantity: &str,
) -> VCenterResult<()> {
    start(writer, BytesStart::new("Item"))?;
    text_element(writer, "rasd:AllocationUnits", allocation_units)?;
    text_element(writer, "rasd:ElementName", element_name)?;
    text_element(writer, "rasd:InstanceID", instance_id)?;
    text_element(writer, "rasd:ResourceType", resource_type)?;
    text_element(writer, "rasd:VirtualQuantity", quantity)?;
    end(writer, "Item")
}

/// Render the descriptor for `vm` as an XML document.
pub fn render_descriptor(vm: &VmInfo) -> VCenterResult<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let mut envelope = BytesStart::new("Envelope");
    envelope.push_attribute(("xmlns", OVF_NS));
    envelope.push_attribute(("xmlns:ovf", OVF_NS));
    envelope.push_attribute(("xmlns:rasd", RASD_NS));
    envelope.push_attribute(("xmlns:vssd", VSSD_NS));
    start(&mut writer, envelope)?;

    writer
        .write_event(Event::Empty(BytesStart::new("References")))
        .map_err(xml_err)?;

    let mut system = BytesStart::new("VirtualSystem");
    system.push_attribute(("ovf:id", vm.name.as_str()));
    start(&mut writer, system)?;
    text_element(&mut writer, "Info", "A virtual machine")?;
    text_element(&mut writer, "Name", &vm.name)?;

    let mut os = BytesStart::new("OperatingSystemSection");
    os.push_attribute(("ovf:id", "1"));
    start(&mut writer, os)?;
    text_element(&mut writer, "Info", "The guest operating system")?;
    text_element(&mut writer, "Description", &vm.guest_os)?;
    end(&mut writer, "OperatingSystemSection")?;

    start(&mut writer, BytesStart::new("VirtualHardwareSection"))?;
    text_element(&mut writer, "Info", "Virtual hardware requirements")?;
    start(&mut writer, BytesStart::new("System"))?;
    text_element(&mut writer, "vssd:ElementName", "Virtual Hardware Family")?;
    text_element(&mut writer, "vssd:InstanceID", "0")?;
    text_element(&mut writer, "vssd:VirtualSystemIdentifier", &vm.uuid)?;
    end(&mut writer, "System")?;

    let cpus = vm.num_cpu.to_string();
    hardware_item(
        &mut writer,
        "1",
        RESOURCE_CPU,
        "hertz * 10^6",
        &format!("{} virtual CPU(s)", cpus),
        &cpus,
    )?;
    let memory = vm.memory_mb.to_string();
    hardware_item(
        &mut writer,
        "2",
        RESOURCE_MEMORY,
        "byte * 2^20",
        &format!("{}MB of memory", memory),
        &memory,
    )?;
    end(&mut writer, "VirtualHardwareSection")?;

    end(&mut writer, "VirtualSystem")?;
    end(&mut writer, "Envelope")?;

    String::from_utf8(writer.into_inner().into_inner()).map_err(xml_err)
}

/// Path of the descriptor for `vm_name` inside `dir`.
///
/// Path separators in the VM name are replaced so the file always lands
/// directly in `dir`.
pub fn descriptor_path(dir: &Path, vm_name: &str) -> PathBuf {
    let file_name: String = vm_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    dir.join(format!("{}.ovf", file_name))
}

/// Write the descriptor for `vm` to `<dir>/<vm>.ovf`.
pub fn write_descriptor(vm: &VmInfo, dir: &Path) -> VCenterResult<PathBuf> {
    let xml = render_descriptor(vm)?;
    fs::create_dir_all(dir)
        .map_err(|e| VCenterError::io(format!("Cannot create {}: {}", dir.display(), e)))?;
    let path = descriptor_path(dir, &vm.name);
    fs::write(&path, xml)
        .map_err(|e| VCenterError::io(format!("Cannot write {}: {}", path.display(), e)))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn web01() -> VmInfo {
        VmInfo {
            name: "web01".into(),
            power_state: "POWERED_ON".into(),
            guest_os: "Ubuntu Linux (64-bit)".into(),
            memory_mb: 8192,
            num_cpu: 4,
            vm_id: "vm-42".into(),
            uuid: "4211-abcd".into(),
        }
    }

    #[test]
    fn descriptor_contains_identity_and_hardware() {
        let xml = render_descriptor(&web01()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<VirtualSystem ovf:id=\"web01\">"));
        assert!(xml.contains("<Description>Ubuntu Linux (64-bit)</Description>"));
        assert!(xml.contains("<vssd:VirtualSystemIdentifier>4211-abcd</vssd:VirtualSystemIdentifier>"));
        assert!(xml.contains("<rasd:VirtualQuantity>4</rasd:VirtualQuantity>"));
        assert!(xml.contains("<rasd:VirtualQuantity>8192</rasd:VirtualQuantity>"));
    }

    #[test]
    fn text_is_escaped() {
        let mut vm = web01();
        vm.guest_os = "Other <custom> & \"odd\"".into();
        let xml = render_descriptor(&vm).unwrap();
        assert!(xml.contains("Other &lt;custom&gt; &amp;"));
    }

    #[test]
    fn writes_into_directory() {
        let dir = TempDir::new().unwrap();
        let path = write_descriptor(&web01(), &dir.path().join("exports")).unwrap();
        assert_eq!(path, dir.path().join("exports").join("web01.ovf"));
        assert!(std::fs::read_to_string(&path).unwrap().contains("web01"));
    }

    #[test]
    fn vm_name_cannot_escape_directory() {
        let path = descriptor_path(Path::new("/tmp/export"), "../etc/passwd");
        assert_eq!(path, Path::new("/tmp/export/.._etc_passwd.ovf"));
    }
}
