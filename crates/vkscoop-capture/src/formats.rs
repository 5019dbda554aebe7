//! Mapping from `VkFormat` to Amber format descriptions.
//!
//! Amber names the formats it understands after the Vulkan enumerators,
//! minus the `VK_FORMAT_` prefix. The name itself carries the layout:
//! an optional `PACKn` chunk, type chunks (`UNORM`, `SFLOAT`, ...) and
//! component chunks (`R8G8B8A8`, `A1R5G5B5`, ...), so the description is
//! parsed straight out of the name.

use ash::vk;

/// Amber's name for a format. Formats Amber cannot express are a capture
/// contract violation and abort.
pub fn amber_format_name(format: vk::Format) -> &'static str {
    match format {
        vk::Format::A1R5G5B5_UNORM_PACK16 => "A1R5G5B5_UNORM_PACK16",
        vk::Format::A2B10G10R10_SINT_PACK32 => "A2B10G10R10_SINT_PACK32",
        vk::Format::A2B10G10R10_SNORM_PACK32 => "A2B10G10R10_SNORM_PACK32",
        vk::Format::A2B10G10R10_SSCALED_PACK32 => "A2B10G10R10_SSCALED_PACK32",
        vk::Format::A2B10G10R10_UINT_PACK32 => "A2B10G10R10_UINT_PACK32",
        vk::Format::A2B10G10R10_UNORM_PACK32 => "A2B10G10R10_UNORM_PACK32",
        vk::Format::A2B10G10R10_USCALED_PACK32 => "A2B10G10R10_USCALED_PACK32",
        vk::Format::A2R10G10B10_SINT_PACK32 => "A2R10G10B10_SINT_PACK32",
        vk::Format::A2R10G10B10_SNORM_PACK32 => "A2R10G10B10_SNORM_PACK32",
        vk::Format::A2R10G10B10_SSCALED_PACK32 => "A2R10G10B10_SSCALED_PACK32",
        vk::Format::A2R10G10B10_UINT_PACK32 => "A2R10G10B10_UINT_PACK32",
        vk::Format::A2R10G10B10_UNORM_PACK32 => "A2R10G10B10_UNORM_PACK32",
        vk::Format::A2R10G10B10_USCALED_PACK32 => "A2R10G10B10_USCALED_PACK32",
        vk::Format::A8B8G8R8_SINT_PACK32 => "A8B8G8R8_SINT_PACK32",
        vk::Format::A8B8G8R8_SNORM_PACK32 => "A8B8G8R8_SNORM_PACK32",
        vk::Format::A8B8G8R8_SRGB_PACK32 => "A8B8G8R8_SRGB_PACK32",
        vk::Format::A8B8G8R8_SSCALED_PACK32 => "A8B8G8R8_SSCALED_PACK32",
        vk::Format::A8B8G8R8_UINT_PACK32 => "A8B8G8R8_UINT_PACK32",
        vk::Format::A8B8G8R8_UNORM_PACK32 => "A8B8G8R8_UNORM_PACK32",
        vk::Format::A8B8G8R8_USCALED_PACK32 => "A8B8G8R8_USCALED_PACK32",
        vk::Format::B10G11R11_UFLOAT_PACK32 => "B10G11R11_UFLOAT_PACK32",
        vk::Format::B4G4R4A4_UNORM_PACK16 => "B4G4R4A4_UNORM_PACK16",
        vk::Format::B5G5R5A1_UNORM_PACK16 => "B5G5R5A1_UNORM_PACK16",
        vk::Format::B5G6R5_UNORM_PACK16 => "B5G6R5_UNORM_PACK16",
        vk::Format::B8G8R8A8_SINT => "B8G8R8A8_SINT",
        vk::Format::B8G8R8A8_SNORM => "B8G8R8A8_SNORM",
        vk::Format::B8G8R8A8_SRGB => "B8G8R8A8_SRGB",
        vk::Format::B8G8R8A8_SSCALED => "B8G8R8A8_SSCALED",
        vk::Format::B8G8R8A8_UINT => "B8G8R8A8_UINT",
        vk::Format::B8G8R8A8_UNORM => "B8G8R8A8_UNORM",
        vk::Format::B8G8R8A8_USCALED => "B8G8R8A8_USCALED",
        vk::Format::B8G8R8_SINT => "B8G8R8_SINT",
        vk::Format::B8G8R8_SNORM => "B8G8R8_SNORM",
        vk::Format::B8G8R8_SRGB => "B8G8R8_SRGB",
        vk::Format::B8G8R8_SSCALED => "B8G8R8_SSCALED",
        vk::Format::B8G8R8_UINT => "B8G8R8_UINT",
        vk::Format::B8G8R8_UNORM => "B8G8R8_UNORM",
        vk::Format::B8G8R8_USCALED => "B8G8R8_USCALED",
        vk::Format::D16_UNORM => "D16_UNORM",
        vk::Format::D16_UNORM_S8_UINT => "D16_UNORM_S8_UINT",
        vk::Format::D24_UNORM_S8_UINT => "D24_UNORM_S8_UINT",
        vk::Format::D32_SFLOAT => "D32_SFLOAT",
        vk::Format::D32_SFLOAT_S8_UINT => "D32_SFLOAT_S8_UINT",
        vk::Format::R16G16B16A16_SFLOAT => "R16G16B16A16_SFLOAT",
        vk::Format::R16G16B16A16_SINT => "R16G16B16A16_SINT",
        vk::Format::R16G16B16A16_SNORM => "R16G16B16A16_SNORM",
        vk::Format::R16G16B16A16_SSCALED => "R16G16B16A16_SSCALED",
        vk::Format::R16G16B16A16_UINT => "R16G16B16A16_UINT",
        vk::Format::R16G16B16A16_UNORM => "R16G16B16A16_UNORM",
        vk::Format::R16G16B16A16_USCALED => "R16G16B16A16_USCALED",
        vk::Format::R16G16B16_SFLOAT => "R16G16B16_SFLOAT",
        vk::Format::R16G16B16_SINT => "R16G16B16_SINT",
        vk::Format::R16G16B16_SNORM => "R16G16B16_SNORM",
        vk::Format::R16G16B16_SSCALED => "R16G16B16_SSCALED",
        vk::Format::R16G16B16_UINT => "R16G16B16_UINT",
        vk::Format::R16G16B16_UNORM => "R16G16B16_UNORM",
        vk::Format::R16G16B16_USCALED => "R16G16B16_USCALED",
        vk::Format::R16G16_SFLOAT => "R16G16_SFLOAT",
        vk::Format::R16G16_SINT => "R16G16_SINT",
        vk::Format::R16G16_SNORM => "R16G16_SNORM",
        vk::Format::R16G16_SSCALED => "R16G16_SSCALED",
        vk::Format::R16G16_UINT => "R16G16_UINT",
        vk::Format::R16G16_UNORM => "R16G16_UNORM",
        vk::Format::R16G16_USCALED => "R16G16_USCALED",
        vk::Format::R16_SFLOAT => "R16_SFLOAT",
        vk::Format::R16_SINT => "R16_SINT",
        vk::Format::R16_SNORM => "R16_SNORM",
        vk::Format::R16_SSCALED => "R16_SSCALED",
        vk::Format::R16_UINT => "R16_UINT",
        vk::Format::R16_UNORM => "R16_UNORM",
        vk::Format::R16_USCALED => "R16_USCALED",
        vk::Format::R32G32B32A32_SFLOAT => "R32G32B32A32_SFLOAT",
        vk::Format::R32G32B32A32_SINT => "R32G32B32A32_SINT",
        vk::Format::R32G32B32A32_UINT => "R32G32B32A32_UINT",
        vk::Format::R32G32B32_SFLOAT => "R32G32B32_SFLOAT",
        vk::Format::R32G32B32_SINT => "R32G32B32_SINT",
        vk::Format::R32G32B32_UINT => "R32G32B32_UINT",
        vk::Format::R32G32_SFLOAT => "R32G32_SFLOAT",
        vk::Format::R32G32_SINT => "R32G32_SINT",
        vk::Format::R32G32_UINT => "R32G32_UINT",
        vk::Format::R32_SFLOAT => "R32_SFLOAT",
        vk::Format::R32_SINT => "R32_SINT",
        vk::Format::R32_UINT => "R32_UINT",
        vk::Format::R4G4B4A4_UNORM_PACK16 => "R4G4B4A4_UNORM_PACK16",
        vk::Format::R4G4_UNORM_PACK8 => "R4G4_UNORM_PACK8",
        vk::Format::R5G5B5A1_UNORM_PACK16 => "R5G5B5A1_UNORM_PACK16",
        vk::Format::R5G6B5_UNORM_PACK16 => "R5G6B5_UNORM_PACK16",
        vk::Format::R64G64B64A64_SFLOAT => "R64G64B64A64_SFLOAT",
        vk::Format::R64G64B64A64_SINT => "R64G64B64A64_SINT",
        vk::Format::R64G64B64A64_UINT => "R64G64B64A64_UINT",
        vk::Format::R64G64B64_SFLOAT => "R64G64B64_SFLOAT",
        vk::Format::R64G64B64_SINT => "R64G64B64_SINT",
        vk::Format::R64G64B64_UINT => "R64G64B64_UINT",
        vk::Format::R64G64_SFLOAT => "R64G64_SFLOAT",
        vk::Format::R64G64_SINT => "R64G64_SINT",
        vk::Format::R64G64_UINT => "R64G64_UINT",
        vk::Format::R64_SFLOAT => "R64_SFLOAT",
        vk::Format::R64_SINT => "R64_SINT",
        vk::Format::R64_UINT => "R64_UINT",
        vk::Format::R8G8B8A8_SINT => "R8G8B8A8_SINT",
        vk::Format::R8G8B8A8_SNORM => "R8G8B8A8_SNORM",
        vk::Format::R8G8B8A8_SRGB => "R8G8B8A8_SRGB",
        vk::Format::R8G8B8A8_SSCALED => "R8G8B8A8_SSCALED",
        vk::Format::R8G8B8A8_UINT => "R8G8B8A8_UINT",
        vk::Format::R8G8B8A8_UNORM => "R8G8B8A8_UNORM",
        vk::Format::R8G8B8A8_USCALED => "R8G8B8A8_USCALED",
        vk::Format::R8G8B8_SINT => "R8G8B8_SINT",
        vk::Format::R8G8B8_SNORM => "R8G8B8_SNORM",
        vk::Format::R8G8B8_SRGB => "R8G8B8_SRGB",
        vk::Format::R8G8B8_SSCALED => "R8G8B8_SSCALED",
        vk::Format::R8G8B8_UINT => "R8G8B8_UINT",
        vk::Format::R8G8B8_UNORM => "R8G8B8_UNORM",
        vk::Format::R8G8B8_USCALED => "R8G8B8_USCALED",
        vk::Format::R8G8_SINT => "R8G8_SINT",
        vk::Format::R8G8_SNORM => "R8G8_SNORM",
        vk::Format::R8G8_SRGB => "R8G8_SRGB",
        vk::Format::R8G8_SSCALED => "R8G8_SSCALED",
        vk::Format::R8G8_UINT => "R8G8_UINT",
        vk::Format::R8G8_UNORM => "R8G8_UNORM",
        vk::Format::R8G8_USCALED => "R8G8_USCALED",
        vk::Format::R8_SINT => "R8_SINT",
        vk::Format::R8_SNORM => "R8_SNORM",
        vk::Format::R8_SRGB => "R8_SRGB",
        vk::Format::R8_SSCALED => "R8_SSCALED",
        vk::Format::R8_UINT => "R8_UINT",
        vk::Format::R8_UNORM => "R8_UNORM",
        vk::Format::R8_USCALED => "R8_USCALED",
        vk::Format::S8_UINT => "S8_UINT",
        vk::Format::X8_D24_UNORM_PACK32 => "X8_D24_UNORM_PACK32",
        other => {
            tracing::error!(format = ?other, "format not supported by amber");
            panic!("format not supported by amber: {other:?}");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentName {
    X,
    D,
    R,
    G,
    B,
    A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    UInt,
    SInt,
    UNorm,
    SNorm,
    UScaled,
    SScaled,
    UFloat,
    SFloat,
    Srgb,
    Stencil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorComponent {
    pub name: ComponentName,
    pub kind: ComponentType,
    pub width: u16,
}

/// A parsed Amber format description.
#[derive(Debug, Clone)]
pub struct AmberFormat {
    format: vk::Format,
    name: &'static str,
    pack_size: u16,
    components: Vec<ColorComponent>,
}

impl AmberFormat {
    pub fn new(format: vk::Format) -> Self {
        let name = amber_format_name(format);
        let (pack_size, components) = parse_name(name);
        Self {
            format,
            name,
            pack_size,
            components,
        }
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Pack size in bits, 0 for non-packed formats.
    pub fn pack_size(&self) -> u16 {
        self.pack_size
    }

    pub fn is_packed(&self) -> bool {
        self.pack_size != 0
    }

    pub fn components(&self) -> &[ColorComponent] {
        &self.components
    }

    /// Sum of the component widths; the number of meaningful bits per
    /// element in the source buffer.
    pub fn data_width_bits(&self) -> u32 {
        self.components.iter().map(|c| u32::from(c.width)).sum()
    }

    /// Trailing padding written after each element. Non-packed
    /// three-component formats align like their four-component
    /// equivalents, so they pad by one component width.
    pub fn padding_bytes(&self) -> u8 {
        if !self.is_packed() && self.components.len() == 3 {
            (self.components[0].width / 8) as u8
        } else {
            0
        }
    }

    /// Element width including padding: a 3x32-bit format reports the
    /// 4-component equivalent's width.
    pub fn total_width_bits(&self) -> u32 {
        self.data_width_bits() + 8 * u32::from(self.padding_bytes())
    }
}

fn parse_name(name: &'static str) -> (u16, Vec<ColorComponent>) {
    let mut pack_size = 0u16;
    let mut components = Vec::new();
    // Chunks are parsed back to front so the type chunk is known before
    // the component chunk it describes.
    let mut current_type = ComponentType::SInt;

    for chunk in name.split('_').rev() {
        match chunk {
            "PACK8" => pack_size = 8,
            "PACK16" => pack_size = 16,
            "PACK32" => pack_size = 32,
            "UINT" => current_type = ComponentType::UInt,
            "UNORM" => current_type = ComponentType::UNorm,
            "UFLOAT" => current_type = ComponentType::UFloat,
            "USCALED" => current_type = ComponentType::UScaled,
            "SINT" => current_type = ComponentType::SInt,
            "SNORM" => current_type = ComponentType::SNorm,
            "SSCALED" => current_type = ComponentType::SScaled,
            "SFLOAT" => current_type = ComponentType::SFloat,
            "SRGB" => current_type = ComponentType::Srgb,
            // Stencil aspects are typed, not stored as components; their
            // bits never reach a vertex attribute.
            "S8" => current_type = ComponentType::Stencil,
            _ => parse_component_chunk(name, chunk, current_type, &mut components),
        }
    }

    (pack_size, components)
}

fn component_name(letter: u8) -> Option<ComponentName> {
    match letter {
        b'X' => Some(ComponentName::X),
        b'D' => Some(ComponentName::D),
        b'R' => Some(ComponentName::R),
        b'G' => Some(ComponentName::G),
        b'B' => Some(ComponentName::B),
        b'A' => Some(ComponentName::A),
        _ => None,
    }
}

/// Parse a component chunk such as `A1R5G5B5`, back to front, prepending
/// each component so the declared order is preserved across chunks.
fn parse_component_chunk(
    name: &str,
    chunk: &str,
    kind: ComponentType,
    components: &mut Vec<ColorComponent>,
) {
    let bytes = chunk.as_bytes();
    let mut position = bytes.len();

    while position > 0 {
        // Scan back to the component letter.
        let letter_index = match (0..position).rev().find(|&i| component_name(bytes[i]).is_some()) {
            Some(index) => index,
            None => {
                tracing::error!(name, chunk, "malformed format component chunk");
                panic!("malformed format component chunk in {name}");
            }
        };
        let letter = match component_name(bytes[letter_index]) {
            Some(letter) => letter,
            None => unreachable!(),
        };

        let digits: String = chunk[letter_index + 1..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let width = match digits.parse::<u16>() {
            Ok(width) if width > 0 => width,
            _ => {
                tracing::error!(name, chunk, "unable to parse component width");
                panic!("unable to parse component width in {name}");
            }
        };

        components.insert(
            0,
            ColorComponent {
                name: letter,
                kind,
                width,
            },
        );
        position = letter_index;
    }
}
