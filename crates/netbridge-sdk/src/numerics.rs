//! Fixed-size numeric structs matching `System.Numerics`

/// Two floats
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    /// x
    pub x: f32,
    /// y
    pub y: f32,
}

/// Three floats
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    /// x
    pub x: f32,
    /// y
    pub y: f32,
    /// z
    pub z: f32,
}

/// Four floats
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector4 {
    /// x
    pub x: f32,
    /// y
    pub y: f32,
    /// z
    pub z: f32,
    /// w
    pub w: f32,
}

/// 4x4 float matrix, row major
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Matrix4x4 {
    /// Rows
    pub m: [[f32; 4]; 4],
}

impl Matrix4x4 {
    /// Identity matrix
    pub fn identity() -> Self {
        let mut m = [[0.0; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Matrix4x4 { m }
    }
}

const _: () = assert!(std::mem::size_of::<Vector2>() == 8);
const _: () = assert!(std::mem::size_of::<Vector3>() == 12);
const _: () = assert!(std::mem::size_of::<Vector4>() == 16);
const _: () = assert!(std::mem::size_of::<Matrix4x4>() == 64);
