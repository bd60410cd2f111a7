use broadside::{BoatPlacement, FleetLayout, LayoutError, Orientation};

fn sample_layout() -> FleetLayout {
    FleetLayout {
        dim: 4,
        boats: vec![
            BoatPlacement {
                row: 0,
                col: 0,
                size: 2,
                orientation: Orientation::Horizontal,
            },
            BoatPlacement {
                row: 2,
                col: 2,
                size: 1,
                orientation: Orientation::Horizontal,
            },
            BoatPlacement {
                row: 3,
                col: 3,
                size: 1,
                orientation: Orientation::Horizontal,
            },
        ],
    }
}

#[test]
fn serializes_to_the_canonical_wire_form() {
    assert_eq!(sample_layout().to_string(), "4;0,0,2,H|2,2,1,H|3,3,1,H");
}

#[test]
fn parses_the_canonical_wire_form() {
    let layout: FleetLayout = "4;0,0,2,H|2,2,1,H|3,3,1,H".parse().unwrap();
    assert_eq!(layout, sample_layout());
}

#[test]
fn round_trips_without_loss() {
    let layout = FleetLayout {
        dim: 12,
        boats: vec![
            BoatPlacement {
                row: 10,
                col: 3,
                size: 6,
                orientation: Orientation::Horizontal,
            },
            BoatPlacement {
                row: 0,
                col: 11,
                size: 5,
                orientation: Orientation::Vertical,
            },
        ],
    };
    let reparsed: FleetLayout = layout.to_string().parse().unwrap();
    assert_eq!(reparsed, layout);
}

#[test]
fn an_empty_fleet_is_representable() {
    let layout = FleetLayout {
        dim: 4,
        boats: Vec::new(),
    };
    assert_eq!(layout.to_string(), "4;");
    let reparsed: FleetLayout = "4;".parse().unwrap();
    assert_eq!(reparsed, layout);
}

#[test]
fn rejects_a_layout_without_a_dimension() {
    assert_eq!(
        "0,0,2,H".parse::<FleetLayout>(),
        Err(LayoutError::MissingDimension)
    );
}

#[test]
fn rejects_non_numeric_fields() {
    assert!(matches!(
        "x;0,0,1,H".parse::<FleetLayout>(),
        Err(LayoutError::InvalidNumber(_))
    ));
    assert!(matches!(
        "4;a,0,1,H".parse::<FleetLayout>(),
        Err(LayoutError::InvalidNumber(_))
    ));
}

#[test]
fn rejects_bad_orientation_codes() {
    assert!(matches!(
        "4;0,0,1,Q".parse::<FleetLayout>(),
        Err(LayoutError::InvalidOrientation(_))
    ));
    assert!(matches!(
        "4;0,0,1,HV".parse::<FleetLayout>(),
        Err(LayoutError::InvalidOrientation(_))
    ));
}

#[test]
fn rejects_malformed_boat_groups() {
    assert!(matches!(
        "4;0,0,1".parse::<FleetLayout>(),
        Err(LayoutError::MalformedBoat(_))
    ));
    assert!(matches!(
        "4;0,0,1,H,9".parse::<FleetLayout>(),
        Err(LayoutError::MalformedBoat(_))
    ));
}
