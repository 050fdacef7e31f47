use glow::HasContext;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::geometry;
use super::point_cloud::{CloudGeometry, PointCloud};
use super::scene::{FrameSnapshot, HighlightMarker};

const SPRITE_VERTEX_SHADER: &str = include_str!("shaders/sprite.vert");
const SPRITE_FRAGMENT_SHADER: &str = include_str!("shaders/sprite.frag");
const INSTANCED_VERTEX_SHADER: &str = include_str!("shaders/instanced.vert");
const INSTANCED_FRAGMENT_SHADER: &str = include_str!("shaders/instanced.frag");
const WIRE_VERTEX_SHADER: &str = include_str!("shaders/wire.vert");
const WIRE_FRAGMENT_SHADER: &str = include_str!("shaders/wire.frag");

const SPHERE_SEGMENTS: u32 = 16;
const SPHERE_RINGS: u32 = 12;
const WIRE_SEGMENTS: u32 = 24;
const WIRE_RINGS: u32 = 12;

/// Floats per sprite vertex: position, color, size
const SPRITE_STRIDE: usize = 7;
/// Floats per sphere instance: model matrix, color
const INSTANCE_STRIDE: usize = 19;
const F32_SIZE: i32 = std::mem::size_of::<f32>() as i32;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Unsupported shader version: {0}")]
    UnsupportedShaderVersion(String),
    #[error("Failed to create {what}: {message}")]
    Allocation { what: &'static str, message: String },
    #[error("{stage} shader error: {log}")]
    Compile { stage: &'static str, log: String },
    #[error("Program link error: {0}")]
    Link(String),
}

fn alloc<T>(what: &'static str, result: Result<T, String>) -> Result<T, RenderError> {
    result.map_err(|message| RenderError::Allocation { what, message })
}

/// GPU buffers of one uploaded cloud
enum GpuCloud {
    Sprites {
        vao: glow::VertexArray,
        vbo: glow::Buffer,
        count: i32,
    },
    Instances {
        vao: glow::VertexArray,
        instance_vbo: glow::Buffer,
        count: i32,
    },
}

impl GpuCloud {
    fn delete(&self, gl: &glow::Context) {
        unsafe {
            match *self {
                GpuCloud::Sprites { vao, vbo, .. } => {
                    gl.delete_vertex_array(vao);
                    gl.delete_buffer(vbo);
                }
                GpuCloud::Instances {
                    vao, instance_vbo, ..
                } => {
                    gl.delete_vertex_array(vao);
                    gl.delete_buffer(instance_vbo);
                }
            }
        }
    }
}

struct SpriteProgram {
    program: glow::Program,
    u_view: Option<glow::UniformLocation>,
    u_projection: Option<glow::UniformLocation>,
    u_scale: Option<glow::UniformLocation>,
    u_sprite: Option<glow::UniformLocation>,
}

struct InstancedProgram {
    program: glow::Program,
    u_view_proj: Option<glow::UniformLocation>,
    u_light_dir: Option<glow::UniformLocation>,
    u_ambient: Option<glow::UniformLocation>,
    u_directional: Option<glow::UniformLocation>,
}

struct WireProgram {
    program: glow::Program,
    u_view_proj: Option<glow::UniformLocation>,
    u_model: Option<glow::UniformLocation>,
    u_color: Option<glow::UniformLocation>,
    u_opacity: Option<glow::UniformLocation>,
}

/// Draws frame snapshots: point sprite clouds, instanced sphere clouds and
/// wireframe highlight markers. Cloud buffers are cached by cloud id and
/// dropped once a cloud leaves the scene.
pub struct SceneRenderer {
    sprite: SpriteProgram,
    instanced: InstancedProgram,
    wire: WireProgram,
    sprite_texture: glow::Texture,
    sphere_vbo: glow::Buffer,
    sphere_ibo: glow::Buffer,
    sphere_index_count: i32,
    wire_vao: glow::VertexArray,
    wire_vbo: glow::Buffer,
    wire_vertex_count: i32,
    clouds: HashMap<u64, GpuCloud>,
}

fn compile_program(
    gl: &glow::Context,
    version: &str,
    vertex_source: &str,
    fragment_source: &str,
    attributes: &[(u32, &str)],
) -> Result<glow::Program, RenderError> {
    unsafe {
        let program = alloc("program", gl.create_program())?;
        let stages = [
            (glow::VERTEX_SHADER, "Vertex", vertex_source),
            (glow::FRAGMENT_SHADER, "Fragment", fragment_source),
        ];

        let mut shaders = Vec::with_capacity(stages.len());
        for (kind, stage, source) in stages {
            let shader = alloc("shader", gl.create_shader(kind))?;
            gl.shader_source(shader, &format!("{}\n{}", version, source));
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                let log = gl.get_shader_info_log(shader);
                gl.delete_shader(shader);
                gl.delete_program(program);
                return Err(RenderError::Compile { stage, log });
            }
            gl.attach_shader(program, shader);
            shaders.push(shader);
        }

        for &(location, name) in attributes {
            gl.bind_attrib_location(program, location, name);
        }

        gl.link_program(program);
        let linked = gl.get_program_link_status(program);
        for shader in shaders {
            gl.detach_shader(program, shader);
            gl.delete_shader(shader);
        }
        if !linked {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(RenderError::Link(log));
        }
        Ok(program)
    }
}

fn upload_floats(gl: &glow::Context, target: u32, data: &[f32]) -> Result<glow::Buffer, RenderError> {
    unsafe {
        let buffer = alloc("buffer", gl.create_buffer())?;
        gl.bind_buffer(target, Some(buffer));
        gl.buffer_data_u8_slice(target, bytemuck::cast_slice(data), glow::STATIC_DRAW);
        Ok(buffer)
    }
}

impl SceneRenderer {
    pub fn new(gl: &glow::Context, sprite_texture_size: usize) -> Result<Self, RenderError> {
        let shader_version = egui_glow::ShaderVersion::get(gl);
        if matches!(
            shader_version,
            egui_glow::ShaderVersion::Gl120 | egui_glow::ShaderVersion::Es100
        ) {
            return Err(RenderError::UnsupportedShaderVersion(format!("{:?}", shader_version)));
        }
        let version = shader_version.version_declaration();

        unsafe {
            let program = compile_program(
                gl,
                version,
                SPRITE_VERTEX_SHADER,
                SPRITE_FRAGMENT_SHADER,
                &[(0, "a_position"), (1, "a_color"), (2, "a_size")],
            )?;
            let sprite = SpriteProgram {
                program,
                u_view: gl.get_uniform_location(program, "u_view"),
                u_projection: gl.get_uniform_location(program, "u_projection"),
                u_scale: gl.get_uniform_location(program, "u_scale"),
                u_sprite: gl.get_uniform_location(program, "u_sprite"),
            };

            let program = compile_program(
                gl,
                version,
                INSTANCED_VERTEX_SHADER,
                INSTANCED_FRAGMENT_SHADER,
                &[(0, "a_position"), (1, "a_normal"), (2, "a_model"), (6, "a_color")],
            )?;
            let instanced = InstancedProgram {
                program,
                u_view_proj: gl.get_uniform_location(program, "u_view_proj"),
                u_light_dir: gl.get_uniform_location(program, "u_light_dir"),
                u_ambient: gl.get_uniform_location(program, "u_ambient"),
                u_directional: gl.get_uniform_location(program, "u_directional"),
            };

            let program = compile_program(
                gl,
                version,
                WIRE_VERTEX_SHADER,
                WIRE_FRAGMENT_SHADER,
                &[(0, "a_position")],
            )?;
            let wire = WireProgram {
                program,
                u_view_proj: gl.get_uniform_location(program, "u_view_proj"),
                u_model: gl.get_uniform_location(program, "u_model"),
                u_color: gl.get_uniform_location(program, "u_color"),
                u_opacity: gl.get_uniform_location(program, "u_opacity"),
            };

            // Sprite texture
            let size = sprite_texture_size.max(2);
            let pixels = geometry::sprite_texture(size);
            let sprite_texture = alloc("texture", gl.create_texture())?;
            gl.bind_texture(glow::TEXTURE_2D, Some(sprite_texture));
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                size as i32,
                size as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                Some(&pixels),
            );
            gl.bind_texture(glow::TEXTURE_2D, None);

            // Shared sphere mesh, interleaved position + normal
            let mesh = geometry::uv_sphere(SPHERE_SEGMENTS, SPHERE_RINGS);
            let vertices: Vec<f32> = mesh
                .positions
                .iter()
                .zip(&mesh.normals)
                .flat_map(|(p, n)| [p.x, p.y, p.z, n.x, n.y, n.z])
                .collect();
            let sphere_vbo = upload_floats(gl, glow::ARRAY_BUFFER, &vertices)?;
            let sphere_ibo = alloc("buffer", gl.create_buffer())?;
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(sphere_ibo));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&mesh.indices),
                glow::STATIC_DRAW,
            );
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);

            // Highlight wireframe
            let lines = geometry::wire_sphere(WIRE_SEGMENTS, WIRE_RINGS);
            let line_vertices: Vec<f32> = lines.iter().flat_map(|p| p.to_array()).collect();
            let wire_vao = alloc("vertex array", gl.create_vertex_array())?;
            gl.bind_vertex_array(Some(wire_vao));
            let wire_vbo = upload_floats(gl, glow::ARRAY_BUFFER, &line_vertices)?;
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, 3 * F32_SIZE, 0);
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            log::info!("Scene renderer created ({:?})", shader_version);

            Ok(Self {
                sprite,
                instanced,
                wire,
                sprite_texture,
                sphere_vbo,
                sphere_ibo,
                sphere_index_count: mesh.indices.len() as i32,
                wire_vao,
                wire_vbo,
                wire_vertex_count: lines.len() as i32,
                clouds: HashMap::new(),
            })
        }
    }

    /// Upload clouds new to this frame and delete buffers of clouds that left the scene
    pub fn sync(&mut self, gl: &glow::Context, frame: &FrameSnapshot) -> Result<(), RenderError> {
        let live: HashSet<u64> = frame.clouds.iter().map(|draw| draw.cloud.id()).collect();
        self.clouds.retain(|id, gpu| {
            let keep = live.contains(id);
            if !keep {
                log::debug!("Releasing GPU buffers of cloud {}", id);
                gpu.delete(gl);
            }
            keep
        });

        for draw in &frame.clouds {
            let id = draw.cloud.id();
            if !self.clouds.contains_key(&id) {
                let gpu = self.upload(gl, &draw.cloud)?;
                self.clouds.insert(id, gpu);
            }
        }
        Ok(())
    }

    fn upload(&self, gl: &glow::Context, cloud: &PointCloud) -> Result<GpuCloud, RenderError> {
        unsafe {
            let vao = alloc("vertex array", gl.create_vertex_array())?;
            gl.bind_vertex_array(Some(vao));

            let gpu = match cloud.geometry() {
                CloudGeometry::Sprites { sizes, .. } => {
                    let data: Vec<f32> = cloud
                        .positions()
                        .iter()
                        .zip(cloud.colors())
                        .zip(sizes)
                        .flat_map(|((p, c), &size)| [p.x, p.y, p.z, c.x, c.y, c.z, size])
                        .collect();
                    let vbo = upload_floats(gl, glow::ARRAY_BUFFER, &data)?;
                    let stride = SPRITE_STRIDE as i32 * F32_SIZE;
                    gl.enable_vertex_attrib_array(0);
                    gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
                    gl.enable_vertex_attrib_array(1);
                    gl.vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, stride, 3 * F32_SIZE);
                    gl.enable_vertex_attrib_array(2);
                    gl.vertex_attrib_pointer_f32(2, 1, glow::FLOAT, false, stride, 6 * F32_SIZE);
                    GpuCloud::Sprites {
                        vao,
                        vbo,
                        count: cloud.len() as i32,
                    }
                }
                CloudGeometry::Instances { transforms, .. } => {
                    // Per-vertex sphere attributes
                    gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.sphere_vbo));
                    gl.enable_vertex_attrib_array(0);
                    gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, 6 * F32_SIZE, 0);
                    gl.enable_vertex_attrib_array(1);
                    gl.vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, 6 * F32_SIZE, 3 * F32_SIZE);
                    gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(self.sphere_ibo));

                    // Per-instance model matrix (4 columns) + color
                    let data: Vec<f32> = transforms
                        .iter()
                        .zip(cloud.colors())
                        .flat_map(|(m, c)| {
                            let mut row = [0.0; INSTANCE_STRIDE];
                            row[..16].copy_from_slice(&m.to_cols_array());
                            row[16..].copy_from_slice(&c.to_array());
                            row
                        })
                        .collect();
                    let instance_vbo = upload_floats(gl, glow::ARRAY_BUFFER, &data)?;
                    let stride = INSTANCE_STRIDE as i32 * F32_SIZE;
                    for column in 0..4u32 {
                        let location = 2 + column;
                        gl.enable_vertex_attrib_array(location);
                        gl.vertex_attrib_pointer_f32(
                            location,
                            4,
                            glow::FLOAT,
                            false,
                            stride,
                            (column as i32) * 4 * F32_SIZE,
                        );
                        gl.vertex_attrib_divisor(location, 1);
                    }
                    gl.enable_vertex_attrib_array(6);
                    gl.vertex_attrib_pointer_f32(6, 3, glow::FLOAT, false, stride, 16 * F32_SIZE);
                    gl.vertex_attrib_divisor(6, 1);

                    GpuCloud::Instances {
                        vao,
                        instance_vbo,
                        count: cloud.len() as i32,
                    }
                }
            };

            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);
            log::debug!("Uploaded cloud {} ({} points)", cloud.id(), cloud.len());
            Ok(gpu)
        }
    }

    /// Draw the visible clouds and highlight markers of `frame`.
    /// The background has already been painted; only depth is cleared here.
    pub fn render(&self, gl: &glow::Context, frame: &FrameSnapshot) {
        let view_proj = frame.projection * frame.view;

        unsafe {
            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LEQUAL);
            gl.depth_mask(true);
            gl.clear(glow::DEPTH_BUFFER_BIT);
            #[cfg(not(target_arch = "wasm32"))]
            gl.enable(glow::PROGRAM_POINT_SIZE);

            for draw in frame.clouds.iter().filter(|draw| draw.visible) {
                match self.clouds.get(&draw.cloud.id()) {
                    Some(GpuCloud::Instances { vao, count, .. }) => {
                        self.draw_instances(gl, *vao, *count, &view_proj, frame);
                    }
                    Some(GpuCloud::Sprites { vao, count, .. }) => {
                        self.draw_sprites(gl, *vao, *count, frame);
                    }
                    None => {}
                }
            }

            for marker in &frame.highlights {
                self.draw_highlight(gl, marker, &view_proj);
            }

            // Clean up state
            gl.bind_vertex_array(None);
            gl.use_program(None);
            gl.bind_texture(glow::TEXTURE_2D, None);
            gl.depth_mask(true);
            gl.disable(glow::BLEND);
            gl.disable(glow::DEPTH_TEST);
            #[cfg(not(target_arch = "wasm32"))]
            gl.disable(glow::PROGRAM_POINT_SIZE);
        }
    }

    unsafe fn draw_instances(
        &self,
        gl: &glow::Context,
        vao: glow::VertexArray,
        count: i32,
        view_proj: &glam::Mat4,
        frame: &FrameSnapshot,
    ) {
        let program = &self.instanced;
        let light = frame.lighting;
        gl.disable(glow::BLEND);
        gl.use_program(Some(program.program));
        if let Some(loc) = &program.u_view_proj {
            gl.uniform_matrix_4_f32_slice(Some(loc), false, &view_proj.to_cols_array());
        }
        if let Some(loc) = &program.u_light_dir {
            gl.uniform_3_f32(Some(loc), light.direction.x, light.direction.y, light.direction.z);
        }
        if let Some(loc) = &program.u_ambient {
            gl.uniform_1_f32(Some(loc), light.ambient);
        }
        if let Some(loc) = &program.u_directional {
            gl.uniform_1_f32(Some(loc), light.directional);
        }
        gl.bind_vertex_array(Some(vao));
        gl.draw_elements_instanced(
            glow::TRIANGLES,
            self.sphere_index_count,
            glow::UNSIGNED_SHORT,
            0,
            count,
        );
    }

    unsafe fn draw_sprites(&self, gl: &glow::Context, vao: glow::VertexArray, count: i32, frame: &FrameSnapshot) {
        let program = &self.sprite;
        gl.enable(glow::BLEND);
        gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
        gl.use_program(Some(program.program));
        if let Some(loc) = &program.u_view {
            gl.uniform_matrix_4_f32_slice(Some(loc), false, &frame.view.to_cols_array());
        }
        if let Some(loc) = &program.u_projection {
            gl.uniform_matrix_4_f32_slice(Some(loc), false, &frame.projection.to_cols_array());
        }
        if let Some(loc) = &program.u_scale {
            gl.uniform_1_f32(Some(loc), frame.viewport_height * 0.5);
        }
        gl.active_texture(glow::TEXTURE0);
        gl.bind_texture(glow::TEXTURE_2D, Some(self.sprite_texture));
        if let Some(loc) = &program.u_sprite {
            gl.uniform_1_i32(Some(loc), 0);
        }
        gl.bind_vertex_array(Some(vao));
        gl.draw_arrays(glow::POINTS, 0, count);
    }

    unsafe fn draw_highlight(&self, gl: &glow::Context, marker: &HighlightMarker, view_proj: &glam::Mat4) {
        let program = &self.wire;
        let model = glam::Mat4::from_translation(marker.position)
            * glam::Mat4::from_scale(glam::Vec3::splat(marker.radius));
        gl.enable(glow::BLEND);
        gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
        gl.depth_mask(false);
        gl.use_program(Some(program.program));
        if let Some(loc) = &program.u_view_proj {
            gl.uniform_matrix_4_f32_slice(Some(loc), false, &view_proj.to_cols_array());
        }
        if let Some(loc) = &program.u_model {
            gl.uniform_matrix_4_f32_slice(Some(loc), false, &model.to_cols_array());
        }
        if let Some(loc) = &program.u_color {
            gl.uniform_3_f32(Some(loc), marker.color.x, marker.color.y, marker.color.z);
        }
        if let Some(loc) = &program.u_opacity {
            gl.uniform_1_f32(Some(loc), marker.opacity);
        }
        gl.bind_vertex_array(Some(self.wire_vao));
        gl.draw_arrays(glow::LINES, 0, self.wire_vertex_count);
        gl.depth_mask(true);
    }

    /// Clean up OpenGL resources
    pub fn destroy(&mut self, gl: &glow::Context) {
        for (_, gpu) in self.clouds.drain() {
            gpu.delete(gl);
        }
        unsafe {
            gl.delete_program(self.sprite.program);
            gl.delete_program(self.instanced.program);
            gl.delete_program(self.wire.program);
            gl.delete_texture(self.sprite_texture);
            gl.delete_buffer(self.sphere_vbo);
            gl.delete_buffer(self.sphere_ibo);
            gl.delete_vertex_array(self.wire_vao);
            gl.delete_buffer(self.wire_vbo);
        }
    }
}
