use std::io::Cursor;

use common::SerdeFormat;

use crate::channel::Channel;
use crate::compound::SeriesMap;
use crate::mapping::{MapError, MapMode, Mapping};
use crate::maps::{PermMap, ShiftMap, TranMap, UnitMap, WinMap, ZoomMap};
use crate::tests::random_points;

fn sample_tree() -> Mapping {
    let window = WinMap::new(vec![0.0], vec![1.0], vec![5.0], vec![9.0]);
    let spliced = TranMap::new(
        Mapping::from(UnitMap::new(1)),
        Mapping::from(ZoomMap::new(1, 0.5)),
    )
    .expect("halves share one axis");

    Mapping::from(ZoomMap::new(3, 1.3))
        .then(Mapping::from(PermMap::new(3, vec![2, 0, 1])))
        .expect("dimensions agree")
        .then(
            Mapping::from(window)
                .over(spliced.into())
                .over(ShiftMap::new(vec![-4.0]).into()),
        )
        .expect("dimensions agree")
}

#[test]
fn yaml_round_trip_preserves_structure_and_behavior() -> anyhow::Result<()> {
    let tree = sample_tree();

    let restored = Mapping::from_yaml(&tree.to_yaml())?;
    assert_eq!(restored, tree);
    assert_eq!(restored.nin(), tree.nin());
    assert_eq!(restored.nout(), tree.nout());

    let points = random_points(3, 16, 59);
    assert!(restored.apply(&points)?.approximately_eq(&tree.apply(&points)?));

    Ok(())
}

#[test]
fn json_channel_round_trip() -> anyhow::Result<()> {
    let tree = sample_tree();
    let channel = Channel::new(SerdeFormat::Json);

    let mut sink = Vec::new();
    assert_eq!(channel.write(&mut sink, &tree)?, 1);

    let restored = channel.read(&mut Cursor::new(sink))?;
    assert_eq!(restored, tree);

    Ok(())
}

#[test]
fn read_from_checked_in_file() -> anyhow::Result<()> {
    let tree = Mapping::from_yaml_file("../test_resources/test_mapping.yml")?;

    assert_eq!(tree.kind(), "CompoundMap");
    assert_eq!(tree.nin(), 2);
    assert_eq!(tree.nout(), 2);
    assert!(tree.is_invertible());

    // matches the same tree built in code
    let built = Mapping::from(ZoomMap::new(2, 1.3)).then(
        Mapping::from(ShiftMap::new(vec![10.0]))
            .over(WinMap::new(vec![0.0], vec![1.0], vec![5.0], vec![9.0]).into()),
    )?;
    assert_eq!(tree, built);

    let reparsed = Mapping::from_yaml(&tree.to_yaml())?;
    assert_eq!(reparsed, tree);

    Ok(())
}

#[test]
fn read_rejects_inconsistent_series_dimensions() {
    let yaml = r#"
!Compound
mode: Series
first: !Zoom
  naxes: 2
  factor: 1.3
second: !Zoom
  naxes: 3
  factor: 2.0
nin: 2
nout: 3
"#;

    let err = Mapping::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("mismatched dimensions"));
}

#[test]
fn read_rejects_stale_dimension_cache() {
    let yaml = r#"
!Compound
mode: Parallel
first: !Zoom
  naxes: 2
  factor: 1.3
second: !Zoom
  naxes: 3
  factor: 2.0
nin: 4
nout: 5
"#;

    let err = Mapping::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("disagree"));
}

#[test]
fn read_rejects_degenerate_zoom() {
    let yaml = r#"
!Zoom
naxes: 2
factor: 0.0
"#;

    let err = Mapping::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("degenerate"));
}

#[test]
fn channel_read_trees_classify_by_mode() -> anyhow::Result<()> {
    let yaml = r#"
!Compound
mode: Parallel
first: !Unit
  naxes: 1
second: !Unit
  naxes: 2
nin: 3
nout: 3
"#;

    let Mapping::Compound(compound) = Mapping::from_yaml(yaml)? else {
        panic!("expected a compound");
    };

    let err = SeriesMap::from_compound(compound.clone()).unwrap_err();
    assert_eq!(
        err,
        MapError::ModeMismatch {
            expected: MapMode::Series,
            actual: MapMode::Parallel,
        }
    );

    Ok(())
}
