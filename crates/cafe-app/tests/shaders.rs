use cafe_core::sim::PosVel;
use cafe_params::{FilterUniforms, RenderUniforms};

const DEPTH_MAP: &str = include_str!("../shaders/depth_map.wgsl");
const COLOR_MAP: &str = include_str!("../shaders/color_map.wgsl");
const COLOR_BLUR: &str = include_str!("../shaders/color_blur.wgsl");
const BILATERAL: &str = include_str!("../shaders/bilateral.wgsl");
const FLUID: &str = include_str!("../shaders/fluid.wgsl");
const GLASS: &str = include_str!("../shaders/glass.wgsl");

fn parse_and_validate(code: &str) -> Result<naga::Module, String> {
    let module = naga::front::wgsl::parse_str(code).map_err(|e| format!("WGSL parse error: {:?}", e))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| format!("WGSL validation error: {:?}", e))?;

    Ok(module)
}

fn struct_size(module: &naga::Module, name: &str) -> u32 {
    let mut layouter = naga::proc::Layouter::default();
    layouter.update(module.to_ctx()).expect("layout");
    let (handle, _) = module
        .types
        .iter()
        .find(|(_, ty)| ty.name.as_deref() == Some(name))
        .unwrap_or_else(|| panic!("struct {} not found", name));
    layouter[handle].size
}

#[test]
fn every_render_pass_has_vertex_and_fragment_stages() {
    for (name, code) in [
        ("depth_map", DEPTH_MAP),
        ("color_map", COLOR_MAP),
        ("color_blur", COLOR_BLUR),
        ("bilateral", BILATERAL),
        ("fluid", FLUID),
        ("glass", GLASS),
    ] {
        let module = parse_and_validate(code).unwrap_or_else(|e| panic!("{}: {}", name, e));
        let stages: Vec<_> = module.entry_points.iter().map(|e| (e.name.as_str(), e.stage)).collect();
        assert_eq!(
            stages,
            vec![("vs_main", naga::ShaderStage::Vertex), ("fs_main", naga::ShaderStage::Fragment)],
            "{}",
            name
        );
    }
}

#[test]
fn render_structs_match_rust_layouts() {
    let render_size = std::mem::size_of::<RenderUniforms>();
    for code in [DEPTH_MAP, COLOR_MAP, FLUID, GLASS] {
        let module = parse_and_validate(code).unwrap();
        assert_eq!(struct_size(&module, "RenderUniforms") as usize, render_size);
    }

    let filter_size = std::mem::size_of::<FilterUniforms>();
    for code in [COLOR_BLUR, BILATERAL] {
        let module = parse_and_validate(code).unwrap();
        assert_eq!(struct_size(&module, "FilterUniforms") as usize, filter_size);
    }

    let depth_map = parse_and_validate(DEPTH_MAP).unwrap();
    assert_eq!(struct_size(&depth_map, "PosVel") as usize, std::mem::size_of::<PosVel>());

    let glass = parse_and_validate(GLASS).unwrap();
    assert_eq!(struct_size(&glass, "GlassUniforms"), 16);
}
