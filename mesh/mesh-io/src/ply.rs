//! PLY (Polygon File Format) support with per-vertex colors.
//!
//! Template meshes are distributed as PLY files whose vertex colors label
//! anatomical regions, so colors are first-class here.
//!
//! # Supported Properties
//!
//! - Vertex positions (x, y, z) - required
//! - Vertex colors (`red`, `green`, `blue`, optional `alpha`) - `uchar`, or
//!   `float`/`double` in `[0, 1]`
//! - Face vertex indices (`vertex_indices` or `vertex_index`)
//!
//! # Example
//!
//! ```no_run
//! use mesh_io::{load_ply, save_ply};
//!
//! let mesh = load_ply("template.ply").unwrap();
//! save_ply(&mesh, "copy.ply", true).unwrap();
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use mesh_types::{IndexedMesh, Vertex, VertexColor};
use ply_rs::parser::Parser;
use ply_rs::ply::{
    Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
    ScalarType,
};
use ply_rs::writer::Writer;
use tracing::debug;

use crate::error::{IoError, IoResult};

const COLOR_CHANNELS: [&str; 4] = ["red", "green", "blue", "alpha"];

/// Load a mesh from a PLY file.
///
/// Supports ASCII, binary little-endian, and binary big-endian formats.
/// Polygonal faces are fan-triangulated.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The file is not valid PLY format
/// - A face references a vertex that does not exist
pub fn load_ply<P: AsRef<Path>>(path: P) -> IoResult<IndexedMesh> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IoError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IoError::Io(e)
        }
    })?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();

    let header = parser
        .read_header(&mut reader)
        .map_err(|e| IoError::invalid_content(format!("failed to parse PLY header: {e}")))?;

    let payload = parser
        .read_payload(&mut reader, &header)
        .map_err(|e| IoError::invalid_content(format!("failed to read PLY payload: {e}")))?;

    let mut mesh = IndexedMesh::new();

    if let Some(vertex_elements) = payload.get("vertex") {
        mesh.vertices.reserve(vertex_elements.len());
        for element in vertex_elements {
            let x = get_float_property(element, "x").unwrap_or(0.0);
            let y = get_float_property(element, "y").unwrap_or(0.0);
            let z = get_float_property(element, "z").unwrap_or(0.0);
            let mut vertex = Vertex::from_coords(f64::from(x), f64::from(y), f64::from(z));
            vertex.color = get_color(element);
            mesh.vertices.push(vertex);
        }
    }

    if let Some(face_elements) = payload.get("face") {
        mesh.faces.reserve(face_elements.len());
        for element in face_elements {
            let indices = get_index_list(element);
            if indices.len() >= 3 {
                #[allow(clippy::cast_possible_truncation)]
                for i in 1..indices.len() - 1 {
                    mesh.faces
                        .push([indices[0] as u32, indices[i] as u32, indices[i + 1] as u32]);
                }
            }
        }
    }

    if let Some(face) = mesh.first_dangling_face() {
        return Err(IoError::invalid_content(format!(
            "face {face} references a vertex past the end of {} vertices",
            mesh.vertices.len()
        )));
    }

    debug!(
        path = %path.display(),
        vertices = mesh.vertices.len(),
        faces = mesh.faces.len(),
        colored = mesh.has_colors(),
        "Loaded PLY mesh"
    );

    Ok(mesh)
}

/// Extract a float property from a PLY element.
fn get_float_property(element: &DefaultElement, key: &str) -> Option<f32> {
    match element.get(key)? {
        Property::Float(v) => Some(*v),
        Property::Double(v) =>
        {
            #[allow(clippy::cast_possible_truncation)]
            Some(*v as f32)
        }
        _ => None,
    }
}

/// Extract one 8-bit color channel, accepting integer or unit-float storage.
fn get_channel(element: &DefaultElement, key: &str) -> Option<u8> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    match element.get(key)? {
        Property::UChar(v) => Some(*v),
        Property::UShort(v) => Some((*v).min(255) as u8),
        Property::Int(v) => Some((*v).clamp(0, 255) as u8),
        Property::UInt(v) => Some((*v).min(255) as u8),
        Property::Float(v) => Some((v.clamp(0.0, 1.0) * 255.0).round() as u8),
        Property::Double(v) => Some((v.clamp(0.0, 1.0) * 255.0).round() as u8),
        _ => None,
    }
}

/// Extract an RGBA color; alpha defaults to opaque when absent.
fn get_color(element: &DefaultElement) -> Option<VertexColor> {
    let r = get_channel(element, COLOR_CHANNELS[0])?;
    let g = get_channel(element, COLOR_CHANNELS[1])?;
    let b = get_channel(element, COLOR_CHANNELS[2])?;
    let a = get_channel(element, COLOR_CHANNELS[3]).unwrap_or(255);
    Some(VertexColor::rgba(r, g, b, a))
}

/// Extract vertex index list from a face element.
fn get_index_list(element: &DefaultElement) -> Vec<usize> {
    for key in &["vertex_indices", "vertex_index"] {
        if let Some(prop) = element.get(*key) {
            return match prop {
                Property::ListInt(v) =>
                {
                    #[allow(clippy::cast_sign_loss)]
                    v.iter().map(|&i| i as usize).collect()
                }
                Property::ListUInt(v) => v.iter().map(|&i| i as usize).collect(),
                Property::ListUChar(v) => v.iter().map(|&i| i as usize).collect(),
                Property::ListShort(v) =>
                {
                    #[allow(clippy::cast_sign_loss)]
                    v.iter().map(|&i| i as usize).collect()
                }
                Property::ListUShort(v) => v.iter().map(|&i| i as usize).collect(),
                _ => continue,
            };
        }
    }
    Vec::new()
}

/// Save a mesh to a PLY file.
///
/// Colors are written only when every vertex has one.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_ply<P: AsRef<Path>>(mesh: &IndexedMesh, path: P, binary: bool) -> IoResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    if binary {
        save_ply_binary(mesh, &mut writer)
    } else {
        save_ply_ascii(mesh, &mut writer)
    }
}

/// Save mesh as binary PLY (little-endian).
///
/// Written by hand: ply-rs writes the element count instead of the list
/// length for binary list properties.
fn save_ply_binary<W: std::io::Write>(mesh: &IndexedMesh, writer: &mut W) -> IoResult<()> {
    let colors = mesh.colors();

    writeln!(writer, "ply")?;
    writeln!(writer, "format binary_little_endian 1.0")?;
    writeln!(writer, "element vertex {}", mesh.vertices.len())?;
    writeln!(writer, "property float x")?;
    writeln!(writer, "property float y")?;
    writeln!(writer, "property float z")?;
    if colors.is_some() {
        for channel in COLOR_CHANNELS {
            writeln!(writer, "property uchar {channel}")?;
        }
    }
    writeln!(writer, "element face {}", mesh.faces.len())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "end_header")?;

    for (i, v) in mesh.vertices.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        {
            writer.write_all(&(v.position.x as f32).to_le_bytes())?;
            writer.write_all(&(v.position.y as f32).to_le_bytes())?;
            writer.write_all(&(v.position.z as f32).to_le_bytes())?;
        }
        if let Some(colors) = &colors {
            writer.write_all(&colors[i].to_array())?;
        }
    }

    for &[i0, i1, i2] in &mesh.faces {
        writer.write_all(&[3u8])?;
        #[allow(clippy::cast_possible_wrap)]
        {
            writer.write_all(&(i0 as i32).to_le_bytes())?;
            writer.write_all(&(i1 as i32).to_le_bytes())?;
            writer.write_all(&(i2 as i32).to_le_bytes())?;
        }
    }

    Ok(())
}

/// Save mesh as ASCII PLY using ply-rs.
fn save_ply_ascii<W: std::io::Write>(mesh: &IndexedMesh, writer: &mut W) -> IoResult<()> {
    let colors = mesh.colors();

    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;

    let mut vertex_def = ElementDef::new("vertex".to_string());
    for axis in ["x", "y", "z"] {
        vertex_def.properties.add(PropertyDef::new(
            axis.to_string(),
            PropertyType::Scalar(ScalarType::Float),
        ));
    }
    if colors.is_some() {
        for channel in COLOR_CHANNELS {
            vertex_def.properties.add(PropertyDef::new(
                channel.to_string(),
                PropertyType::Scalar(ScalarType::UChar),
            ));
        }
    }
    vertex_def.count = mesh.vertices.len();
    ply.header.elements.add(vertex_def);

    let mut face_def = ElementDef::new("face".to_string());
    face_def.properties.add(PropertyDef::new(
        "vertex_indices".to_string(),
        PropertyType::List(ScalarType::UChar, ScalarType::Int),
    ));
    face_def.count = mesh.faces.len();
    ply.header.elements.add(face_def);

    let mut vertex_elements = Vec::with_capacity(mesh.vertices.len());
    for (i, v) in mesh.vertices.iter().enumerate() {
        let mut element = DefaultElement::new();
        #[allow(clippy::cast_possible_truncation)]
        {
            element.insert("x".to_string(), Property::Float(v.position.x as f32));
            element.insert("y".to_string(), Property::Float(v.position.y as f32));
            element.insert("z".to_string(), Property::Float(v.position.z as f32));
        }
        if let Some(colors) = &colors {
            for (channel, value) in COLOR_CHANNELS.iter().zip(colors[i].to_array()) {
                element.insert((*channel).to_string(), Property::UChar(value));
            }
        }
        vertex_elements.push(element);
    }
    ply.payload.insert("vertex".to_string(), vertex_elements);

    let mut face_elements = Vec::with_capacity(mesh.faces.len());
    for &[i0, i1, i2] in &mesh.faces {
        let mut element = DefaultElement::new();
        #[allow(clippy::cast_possible_wrap)]
        let indices = vec![i0 as i32, i1 as i32, i2 as i32];
        element.insert("vertex_indices".to_string(), Property::ListInt(indices));
        face_elements.push(element);
    }
    ply.payload.insert("face".to_string(), face_elements);

    let ply_writer = Writer::new();
    ply_writer
        .write_ply(writer, &mut ply)
        .map_err(|e| IoError::invalid_content(format!("failed to write PLY: {e}")))?;

    Ok(())
}
