use std::{
    cell::RefCell,
    rc::Rc,
};
use three_d::*;
use bus::Bus;

use crate::log; // macro import
use crate::utils::*;
use crate::text::{extrude_text, lit_cells};


/// Cube map faces in the order Skybox::new() takes them: right, left, top, bottom, front, back
pub const SKYBOX_FACES: [&str; 6] = ["px.png", "nx.png", "py.png", "ny.png", "pz.png", "nz.png"];

const TABLE_HEIGHT: f32 = 2.0;
const TABLE_THICKNESS: f32 = 0.1;
const TABLE_HALF_WIDTH: f32 = 3.0;
const TABLE_HALF_DEPTH: f32 = 1.5;
const TABLE_Z: f32 = -4.0;
const LEG_RADIUS: f32 = 0.1;
const LAMP_X: f32 = -2.2;
const LAMP_Z: f32 = -4.8;
const LAMP_POLE_HEIGHT: f32 = 1.2;
const PANEL_HALF_SIZE: (f32, f32) = (1.6, 0.9);
const TEXT_CELL: f32 = 0.12;
const TEXT_DEPTH: f32 = 0.25;
const TEXT_HEIGHT: f32 = 4.6;


/// Height of the table's top surface
pub fn table_surface() -> f32 {
    TABLE_HEIGHT + TABLE_THICKNESS
}


/// Assets that arrive asynchronously from the network
#[derive(Clone)]
pub enum SceneAsset {
    Skybox(Box<[CpuTexture; 6]>),
    PanelTexture(CpuTexture),
    Failed(String),
}


/// Fetches the six skybox faces and broadcasts them to the render loop
pub fn load_skybox(base_url: String, bus: Rc<RefCell<Bus<SceneAsset>>>) {
    execute_future(async move {
        let asset = match fetch_skybox(&base_url).await {
            Ok(faces) => SceneAsset::Skybox(Box::new(faces)),
            Err(e) => SceneAsset::Failed(e),
        };
        broadcast(&bus, asset);
    });
}


/// Fetches the image shown on the panel and broadcasts it to the render loop
pub fn load_panel_texture(url: String, bus: Rc<RefCell<Bus<SceneAsset>>>) {
    execute_future(async move {
        let asset = match fetch_texture(&url).await {
            Ok(texture) => SceneAsset::PanelTexture(texture),
            Err(e) => SceneAsset::Failed(e),
        };
        broadcast(&bus, asset);
    });
}


fn broadcast(bus: &Rc<RefCell<Bus<SceneAsset>>>, asset: SceneAsset) {
    // non-blocking (i.e., no atomic.wait)
    if bus.borrow_mut().try_broadcast(asset).is_err() {
        log!("broadcast(): ERROR: asset bus is full, dropping asset");
    }
}


async fn fetch_skybox(base_url: &str) -> Result<[CpuTexture; 6], String> {
    let urls: Vec<String> = SKYBOX_FACES.iter()
        .map(|face| format!("{}{}", base_url, face))
        .collect();
    log!("fetch_skybox(): loading {:?}", urls);

    let mut loaded = three_d_asset::io::load_async(urls.as_slice())
        .await
        .map_err(|e| format!("could not load skybox from {}: {:?}", base_url, e))?;

    let mut decode = |url: &String| -> Result<CpuTexture, String> {
        loaded
            .deserialize(url)
            .map_err(|e| format!("could not decode {}: {:?}", url, e))
    };
    Ok([
        decode(&urls[0])?,
        decode(&urls[1])?,
        decode(&urls[2])?,
        decode(&urls[3])?,
        decode(&urls[4])?,
        decode(&urls[5])?,
    ])
}


async fn fetch_texture(url: &str) -> Result<CpuTexture, String> {
    log!("fetch_texture(): loading {}", url);
    let mut loaded = three_d_asset::io::load_async(&[url])
        .await
        .map_err(|e| format!("could not load {}: {:?}", url, e))?;
    loaded
        .deserialize(url)
        .map_err(|e| format!("could not decode {}: {:?}", url, e))
}


/// Creates a skybox from faces in SKYBOX_FACES order
pub fn skybox_from_faces(context: &Context, faces: &[CpuTexture; 6]) -> Skybox {
    Skybox::new(
        context,
        &faces[0],
        &faces[1],
        &faces[2],
        &faces[3],
        &faces[4],
        &faces[5],
    )
}


/// A browser-window-like image used on the panel until a real one is loaded
pub fn placeholder_panel_texture() -> CpuTexture {
    let (width, height) = (128_u32, 72_u32);
    let title_bar = 10;
    let mut data = Vec::with_capacity((width*height) as usize);
    for y in 0..height {
        for x in 0..width {
            let pixel = if y < title_bar {
                [60, 64, 72, 255]
            } else if (x/16 + y/16) % 2 == 0 {
                [235, 238, 242, 255]
            } else {
                [205, 214, 226, 255]
            };
            data.push(pixel);
        }
    }
    CpuTexture {
        name: "panel placeholder".to_string(),
        data: TextureData::RgbaU8(data),
        width,
        height,
        ..Default::default()
    }
}


#[derive(Clone, Debug)]
pub enum Primitive {
    Cube,
    Cylinder,
    Cone,
    Sphere,
    Text(String),
}
impl Primitive {
    pub fn cpu_mesh(&self) -> CpuMesh {
        match self {
            Primitive::Cube => CpuMesh::cube(),
            Primitive::Cylinder => CpuMesh::cylinder(24),
            Primitive::Cone => CpuMesh::cone(24),
            Primitive::Sphere => CpuMesh::sphere(16),
            Primitive::Text(text) => extrude_text(text, TEXT_CELL, TEXT_DEPTH),
        }
    }
}


/// One static piece of the tabletop scene
#[derive(Clone, Debug)]
pub struct Part {
    pub name: &'static str,
    pub primitive: Primitive,
    pub transform: Mat4,
    pub albedo: Srgba,
    pub emissive: Srgba,
}
impl Part {
    fn new(name: &'static str, primitive: Primitive, transform: Mat4, albedo: Srgba) -> Self {
        Self {
            name,
            primitive,
            transform,
            albedo,
            emissive: Srgba::BLACK,
        }
    }
}


/// Cylinders and cones run along +x from 0 to 1; this stands them up along +y
fn upright(base: Vec3, height: f32, radius: f32) -> Mat4 {
    Mat4::from_translation(base)
        * Mat4::from_angle_z(degrees(90.0))
        * Mat4::from_nonuniform_scale(height, radius, radius)
}


/// Static geometry of the tabletop demo: table, legs, lamp and text
pub fn tabletop_parts(text: &str) -> Vec<Part> {
    let wood = Srgba::new_opaque(133, 94, 66);
    let metal = Srgba::new_opaque(70, 72, 78);
    let shade = Srgba::new_opaque(40, 110, 90);
    let surface = table_surface();

    let mut parts = vec![Part::new(
        "table top",
        Primitive::Cube,
        Mat4::from_translation(vec3(0.0, TABLE_HEIGHT, TABLE_Z))
            * Mat4::from_nonuniform_scale(TABLE_HALF_WIDTH, TABLE_THICKNESS, TABLE_HALF_DEPTH),
        wood,
    )];

    let leg_height = TABLE_HEIGHT - TABLE_THICKNESS;
    let leg_x = TABLE_HALF_WIDTH - 0.3;
    let leg_z = TABLE_HALF_DEPTH - 0.3;
    for (sx, sz) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
        parts.push(Part::new(
            "table leg",
            Primitive::Cylinder,
            upright(vec3(sx*leg_x, 0.0, TABLE_Z + sz*leg_z), leg_height, LEG_RADIUS),
            wood,
        ));
    }

    parts.push(Part::new(
        "lamp base",
        Primitive::Cylinder,
        upright(vec3(LAMP_X, surface, LAMP_Z), 0.08, 0.35),
        metal,
    ));
    parts.push(Part::new(
        "lamp pole",
        Primitive::Cylinder,
        upright(vec3(LAMP_X, surface + 0.08, LAMP_Z), LAMP_POLE_HEIGHT, 0.04),
        metal,
    ));
    let shade_base = surface + 0.08 + LAMP_POLE_HEIGHT - 0.2;
    parts.push(Part::new(
        "lamp shade",
        Primitive::Cone,
        upright(vec3(LAMP_X, shade_base, LAMP_Z), 0.5, 0.4),
        shade,
    ));
    let mut bulb = Part::new(
        "lamp bulb",
        Primitive::Sphere,
        Mat4::from_translation(lamp_bulb_position()) * Mat4::from_scale(0.12),
        Srgba::WHITE,
    );
    bulb.emissive = Srgba::new_opaque(255, 236, 190);
    parts.push(bulb);

    parts.push(Part::new(
        "panel frame",
        Primitive::Cube,
        Mat4::from_translation(panel_center() - vec3(0.0, 0.0, 0.04))
            * Mat4::from_nonuniform_scale(PANEL_HALF_SIZE.0 + 0.06, PANEL_HALF_SIZE.1 + 0.06, 0.03),
        Srgba::new_opaque(25, 25, 28),
    ));

    if !lit_cells(text).is_empty() {
        parts.push(Part::new(
            "text",
            Primitive::Text(text.to_string()),
            Mat4::from_translation(vec3(0.0, TEXT_HEIGHT, TABLE_Z - 1.5)),
            Srgba::new_opaque(200, 60, 40),
        ));
    }

    parts
}


/// Comma-separated names of `parts`, repeated pieces counted once with a multiplier
pub fn part_names(parts: &[Part]) -> String {
    let mut names: Vec<(&str, usize)> = Vec::new();
    for part in parts {
        match names.iter_mut().find(|(name, _)| *name == part.name) {
            Some((_, count)) => *count += 1,
            None => names.push((part.name, 1)),
        }
    }
    names.iter()
        .map(|(name, count)| if *count > 1 { format!("{} x{}", name, count) } else { name.to_string() })
        .collect::<Vec<_>>()
        .join(", ")
}


/// Where the lamp's light sits
pub fn lamp_bulb_position() -> Vec3 {
    vec3(LAMP_X, table_surface() + 0.08 + LAMP_POLE_HEIGHT - 0.1, LAMP_Z)
}


/// Center of the embedded panel standing on the table, facing +z
pub fn panel_center() -> Vec3 {
    vec3(0.4, table_surface() + PANEL_HALF_SIZE.1 + 0.05, TABLE_Z - 0.9)
}


/// GPU side of the tabletop demo
pub struct TabletopScene {
    pub meshes: Vec<Gm<Mesh, PhysicalMaterial>>,
    /// Planar embedded content, drawn in the overlay pass
    pub panel: Gm<Mesh, ColorMaterial>,
    pub ambient: AmbientLight,
    pub sun: DirectionalLight,
    pub lamp: PointLight,
}
impl TabletopScene {
    pub fn new(context: &Context, text: &str) -> Self {
        let parts = tabletop_parts(text);
        log!("TabletopScene::new(): parts: {}", part_names(&parts));

        let meshes = parts
            .into_iter()
            .map(|part| {
                let mut gm = Gm::new(
                    Mesh::new(context, &part.primitive.cpu_mesh()),
                    PhysicalMaterial::new_opaque(
                        context,
                        &CpuMaterial {
                            albedo: part.albedo,
                            emissive: part.emissive,
                            roughness: 0.7,
                            metallic: 0.1,
                            ..Default::default()
                        },
                    ),
                );
                gm.set_transformation(part.transform);
                gm
            })
            .collect::<Vec<_>>();
        log!("TabletopScene::new(): {} meshes", meshes.len());

        let mut panel = Gm::new(
            Mesh::new(context, &CpuMesh::square()),
            panel_material(context, &placeholder_panel_texture()),
        );
        panel.set_transformation(
            Mat4::from_translation(panel_center())
                * Mat4::from_nonuniform_scale(PANEL_HALF_SIZE.0, PANEL_HALF_SIZE.1, 1.0)
        );

        Self {
            meshes,
            panel,
            ambient: AmbientLight::new(context, 0.3, Srgba::WHITE),
            sun: DirectionalLight::new(context, 1.2, Srgba::WHITE, &vec3(-0.5, -1.0, -0.7)),
            lamp: PointLight::new(
                context,
                3.0,
                Srgba::new_opaque(255, 230, 180),
                &lamp_bulb_position(),
                Attenuation { constant: 1.0, linear: 0.2, quadratic: 0.15 },
            ),
        }
    }

    pub fn lights(&self) -> [&dyn Light; 3] {
        [&self.ambient, &self.sun, &self.lamp]
    }

    /// Replaces the placeholder on the panel
    pub fn set_panel_texture(&mut self, context: &Context, texture: &CpuTexture) {
        self.panel.material = panel_material(context, texture);
    }
}


fn panel_material(context: &Context, texture: &CpuTexture) -> ColorMaterial {
    ColorMaterial::new_opaque(
        context,
        &CpuMaterial {
            albedo: Srgba::WHITE,
            albedo_texture: Some(texture.clone()),
            ..Default::default()
        },
    )
}


/// GPU side of the skybox demo: only a light, the skybox arrives later
pub struct SkyboxScene {
    pub light: PointLight,
}
impl SkyboxScene {
    pub fn new(context: &Context) -> Self {
        Self {
            light: PointLight::new(
                context,
                2.5,
                Srgba::WHITE,
                &vec3(0.0, 5.0, -5.0),
                // fades out over roughly 10 units
                Attenuation { constant: 1.0, linear: 0.0, quadratic: 0.1 },
            ),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn transform_point(m: &Mat4, p: Vec3) -> Vec3 {
        let v = *m * Vec4::new(p.x, p.y, p.z, 1.0);
        vec3(v.x, v.y, v.z)
    }

    fn part<'a>(parts: &'a [Part], name: &str) -> &'a Part {
        parts.iter().find(|p| p.name == name).unwrap()
    }

    #[test]
    fn legs_stand_on_the_floor_under_the_top() {
        let parts = tabletop_parts("RUST");
        let legs: Vec<&Part> = parts.iter().filter(|p| p.name == "table leg").collect();
        assert_eq!(legs.len(), 4);
        for leg in legs {
            let bottom = transform_point(&leg.transform, vec3(0.0, 0.0, 0.0));
            let top = transform_point(&leg.transform, vec3(1.0, 0.0, 0.0));
            assert!(bottom.y.abs() < 1e-5);
            assert!((top.y - (TABLE_HEIGHT - TABLE_THICKNESS)).abs() < 1e-5);
            assert!(top.x.abs() < TABLE_HALF_WIDTH);
            assert!((top.z - TABLE_Z).abs() < TABLE_HALF_DEPTH);
        }
    }

    #[test]
    fn table_top_surface_height() {
        let parts = tabletop_parts("RUST");
        let top = part(&parts, "table top");
        let upper = transform_point(&top.transform, vec3(1.0, 1.0, 1.0));
        assert!((upper.y - table_surface()).abs() < 1e-5);
    }

    #[test]
    fn lamp_sits_on_the_table() {
        let parts = tabletop_parts("RUST");
        let base = part(&parts, "lamp base");
        let bottom = transform_point(&base.transform, vec3(0.0, 0.0, 0.0));
        assert!((bottom.y - table_surface()).abs() < 1e-5);

        let shade = part(&parts, "lamp shade");
        let shade_bottom = transform_point(&shade.transform, vec3(0.0, 0.0, 0.0));
        let shade_tip = transform_point(&shade.transform, vec3(1.0, 0.0, 0.0));
        let bulb = lamp_bulb_position();
        assert!(shade_bottom.y < bulb.y && bulb.y < shade_tip.y);
        assert_ne!(part(&parts, "lamp bulb").emissive, Srgba::BLACK);
    }

    #[test]
    fn shade_opens_downwards_over_the_bulb() {
        let parts = tabletop_parts("RUST");
        let shade = part(&parts, "lamp shade");
        let bulb = lamp_bulb_position();

        let points: Vec<Vec3> = shade.primitive.cpu_mesh().positions.to_f32()
            .into_iter()
            .map(|p| transform_point(&shade.transform, p))
            .collect();
        let radius = |p: &Vec3| ((p.x - LAMP_X).powi(2) + (p.z - LAMP_Z).powi(2)).sqrt();

        // the wide rim is the lowest ring, the apex is the highest point
        let widest = points.iter().cloned().fold(points[0], |a, b| if radius(&b) > radius(&a) { b } else { a });
        let highest = points.iter().cloned().fold(points[0], |a, b| if b.y > a.y { b } else { a });
        assert!(widest.y < bulb.y);
        assert!(highest.y > bulb.y);
        assert!(radius(&highest) < 1e-3);
        assert!(radius(&widest) > 0.3);
    }

    #[test]
    fn part_names_summarize_the_scene() {
        let parts = tabletop_parts("RUST");
        assert!(parts.iter().all(|p| !p.name.is_empty()));
        let names = part_names(&parts);
        assert!(names.starts_with("table top, table leg x4, lamp base"));
        assert!(names.ends_with("text"));
        assert_eq!(part_names(&[]), "");
    }

    #[test]
    fn panel_stands_on_the_table() {
        let bottom = panel_center().y - PANEL_HALF_SIZE.1;
        assert!(bottom > table_surface());
        assert!((panel_center().z - TABLE_Z).abs() < TABLE_HALF_DEPTH);
    }

    #[test]
    fn text_is_skipped_when_nothing_can_be_drawn() {
        assert!(tabletop_parts("RUST").iter().any(|p| p.name == "text"));
        assert!(!tabletop_parts("###").iter().any(|p| p.name == "text"));
    }

    #[test]
    fn placeholder_texture_dimensions() {
        let t = placeholder_panel_texture();
        match &t.data {
            TextureData::RgbaU8(data) => assert_eq!(data.len(), (t.width*t.height) as usize),
            _ => panic!("expected RGBA8 data"),
        }
    }

    #[test]
    fn skybox_faces_in_cube_map_order() {
        assert_eq!(SKYBOX_FACES[0], "px.png");
        assert_eq!(SKYBOX_FACES[5], "nz.png");
    }
}
