use loam_blocks::{BlockType, Opacity};
use serde::Deserialize;

#[test]
fn opaque_blocks_have_no_attenuation() {
    for kind in BlockType::ALL {
        if kind.is_opaque() {
            assert_eq!(kind.light_attenuation(), 0, "{}", kind.debug_name());
        }
    }
}

#[test]
fn translucent_set_is_leaves_ice_water() {
    let translucent: Vec<_> = BlockType::ALL
        .into_iter()
        .filter(|k| matches!(k.opacity(), Opacity::Translucent(_)))
        .collect();
    assert_eq!(
        translucent,
        vec![BlockType::Water, BlockType::Leaves, BlockType::Ice]
    );
    assert_eq!(BlockType::Water.light_attenuation(), 2);
    assert_eq!(BlockType::Leaves.light_attenuation(), 1);
}

#[test]
fn air_and_water_are_not_solid() {
    assert!(!BlockType::Air.is_solid());
    assert!(!BlockType::Water.is_solid());
    assert!(BlockType::Bedrock.is_solid());
    assert!(BlockType::Water.is_fluid());
}

#[derive(Deserialize)]
struct Named {
    surface: BlockType,
}

#[test]
fn serde_names_match_debug_names() {
    for kind in BlockType::ALL {
        let src = format!("surface = \"{}\"", kind.debug_name());
        let parsed: Named = toml::from_str(&src).unwrap();
        assert_eq!(parsed.surface, kind);
    }
}
