// Overlay snapshots decoded from their JSON wire form, built and painted

use chan_overlay::overlay::checks::{join_sequence, local_extremum_violations, RenderedEndpoints};
use chan_overlay::overlay::renderer::{level_colors, ANCHOR_BORDER_COLOR, CANDIDATE_DASH};
use chan_overlay::overlay::types::{Direction, TimePrice};
use chan_overlay::overlay::{
    render, ChanDrawingSettings, GeometryBuilder, LinearViewport, OverlayResponse, PaintOp,
    VisibleRange,
};

const OVERLAY_JSON: &str = r#"{
    "schema_version": "newchan_overlay_v2",
    "symbol": "BZ", "tf": "1m", "detail": "full",
    "lstar": {"level": 2, "center_id": 0, "regime": "trend_up", "is_alive": true},
    "strokes": [
        {"id": 0, "t0": 0, "t1": 60, "dir": "up", "confirmed": true, "p0": 5.0, "p1": 20.0},
        {"id": 1, "t0": 60, "t1": 120, "dir": "down", "confirmed": true, "p0": 20.0, "p1": 10.0},
        {"id": 2, "t0": 120, "t1": 180, "dir": "up", "confirmed": false, "p0": 10.0, "p1": 25.0}
    ],
    "segments": [
        {"id": 0, "t0": 0, "t1": 180, "s0": 0, "s1": 2, "dir": "up", "confirmed": false,
         "p0": 5.0, "p1": 25.0,
         "ep0": {"merged_i": 0, "time": 0, "price": 5.0, "type": "bottom"},
         "ep1": {"merged_i": 3, "time": 180, "price": 25.0, "type": "top"}}
    ],
    "levels": [
        {"level": 2, "n_moves": 1, "centers": [
            {"id": 0, "t0": 0, "t1": 180, "ZD": 10.0, "ZG": 20.0, "kind": "settled"}
        ]},
        {"level": 1, "n_moves": 3, "centers": [
            {"id": 0, "t0": 60, "t1": 120, "ZD": 12.0, "ZG": 18.0, "kind": "candidate"}
        ]}
    ]
}"#;

/// x = seconds, y = 10px per price unit below 25
fn viewport() -> LinearViewport {
    LinearViewport::new(
        VisibleRange {
            time_from: 0,
            time_to: 180,
            price_low: 5.0,
            price_high: 25.0,
        },
        180.0,
        200.0,
    )
}

fn rendered(dir: Direction, a: (i64, f64), b: (i64, f64)) -> RenderedEndpoints {
    RenderedEndpoints {
        start: TimePrice::new(a.0, a.1),
        end: TimePrice::new(b.0, b.1),
        dir,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_overlay_maps_to_pixels() {
        let overlay: OverlayResponse = serde_json::from_str(OVERLAY_JSON).unwrap();
        assert!(overlay.is_supported_schema());

        let geometry = GeometryBuilder::new().build(&overlay, &viewport());
        assert!(!geometry.diagnostics.has_findings(), "{:?}", geometry.diagnostics);
        assert_eq!(geometry.diagnostics.skipped_primitives, 0);

        let first = geometry.strokes[0];
        assert_eq!((first.x0, first.y0, first.y1), (0.0, 200.0, 50.0));
        assert!((first.x1 - 60.0).abs() < 1e-9);
        let seg = geometry.segments[0];
        assert_eq!((seg.x0, seg.y0, seg.x1, seg.y1), (0.0, 200.0, 180.0, 0.0));
        assert!(!seg.confirmed);
    }

    #[test]
    fn test_boxes_ordered_by_level_with_anchor() {
        let overlay: OverlayResponse = serde_json::from_str(OVERLAY_JSON).unwrap();
        let geometry = GeometryBuilder::new().build(&overlay, &viewport());

        let levels: Vec<u32> = geometry.boxes.iter().map(|b| b.level).collect();
        assert_eq!(levels, vec![1, 2]);
        assert!(!geometry.boxes[0].is_anchor);
        assert!(geometry.boxes[1].is_anchor);
        assert!(geometry.boxes[1].settled);
    }

    #[test]
    fn test_paint_order_and_styles() {
        let overlay: OverlayResponse = serde_json::from_str(OVERLAY_JSON).unwrap();
        let geometry = GeometryBuilder::new().build(&overlay, &viewport());
        let ops = render(&geometry, &ChanDrawingSettings::default());
        assert_eq!(ops.len(), 8);

        match &ops[0] {
            PaintOp::FillRect { color, .. } => assert_eq!(color, level_colors(1).candidate_fill),
            other => panic!("expected level-1 fill first, got {:?}", other),
        }
        match &ops[2] {
            PaintOp::FillRect { color, y, h, .. } => {
                assert_eq!(color, level_colors(2).fill);
                assert_eq!((*y, *h), (50.0, 100.0));
            }
            other => panic!("expected level-2 fill, got {:?}", other),
        }
        match &ops[3] {
            PaintOp::StrokeRect { color, .. } => assert_eq!(color, ANCHOR_BORDER_COLOR),
            other => panic!("expected anchor outline, got {:?}", other),
        }
        match &ops[4] {
            PaintOp::Line { width, dash, .. } => {
                assert_eq!(*width, 3.0);
                assert_eq!(*dash, Some(CANDIDATE_DASH));
            }
            other => panic!("expected segment line, got {:?}", other),
        }
        let stroke_dashes: Vec<bool> = ops[5..]
            .iter()
            .map(|op| matches!(op, PaintOp::Line { dash: Some(_), .. }))
            .collect();
        assert_eq!(stroke_dashes, vec![false, false, true]);
    }

    #[test]
    fn test_off_scale_primitives_skipped_individually() {
        let overlay: OverlayResponse = serde_json::from_str(OVERLAY_JSON).unwrap();
        let mut narrow = viewport();
        narrow.set_range(VisibleRange {
            time_from: 0,
            time_to: 120,
            price_low: 5.0,
            price_high: 25.0,
        });

        let geometry = GeometryBuilder::new().build(&overlay, &narrow);
        assert_eq!(geometry.strokes.len(), 2);
        assert!(geometry.segments.is_empty());
        assert_eq!(geometry.boxes.len(), 1);
        assert_eq!(geometry.diagnostics.skipped_primitives, 3);
    }

    #[test]
    fn test_zigzag_joins_hold_extremum_rule() {
        let chain = [
            rendered(Direction::Up, (0, 5.0), (10, 20.0)),
            rendered(Direction::Down, (10, 20.0), (20, 5.0)),
        ];
        assert!(local_extremum_violations(&join_sequence(&chain)).is_empty());
    }

    #[test]
    fn test_top_below_next_join_is_flagged() {
        let chain = [
            rendered(Direction::Up, (0, 5.0), (10, 20.0)),
            rendered(Direction::Down, (10, 20.0), (20, 25.0)),
        ];
        let violations = local_extremum_violations(&join_sequence(&chain));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].index, 1);
        assert_eq!(violations[0].mid, 20.0);
    }
}
