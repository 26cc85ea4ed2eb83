#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::strokes::Run;
    use rgb::RGB8;
    use std::collections::HashMap;

    const A: RGB8 = RGB8::new(10, 10, 10);
    const B: RGB8 = RGB8::new(200, 0, 0);
    const C: RGB8 = RGB8::new(0, 0, 200);

    /// Build a row from `(color, first_x, last_x)` triples on line `y`.
    fn row(y: i32, runs: &[(RGB8, i32, i32)]) -> ScanRow {
        runs.iter()
            .map(|&(color, a, b)| Run {
                color,
                stroke: Stroke::horizontal(y, a, b),
            })
            .collect()
    }

    fn frequency_of(rows: &[ScanRow]) -> Vec<(Color, u64)> {
        let mut freq: Vec<(Color, u64)> = Vec::new();
        for run in rows.iter().flatten() {
            match freq.iter_mut().find(|(c, _)| *c == run.color) {
                Some(entry) => entry.1 += run.stroke.width() as u64,
                None => freq.push((run.color, run.stroke.width() as u64)),
            }
        }
        freq
    }

    fn paint(map: &StrokeMap) -> HashMap<(i32, i32), Color> {
        let mut canvas = HashMap::new();
        for (color, stroke) in map.strokes_in_order() {
            for x in stroke.start.x..=stroke.end.x {
                canvas.insert((x, stroke.start.y), color);
            }
        }
        canvas
    }

    fn expected(rows: &[ScanRow]) -> HashMap<(i32, i32), Color> {
        let mut canvas = HashMap::new();
        for run in rows.iter().flatten() {
            for x in run.stroke.start.x..=run.stroke.end.x {
                canvas.insert((x, run.stroke.start.y), run.color);
            }
        }
        canvas
    }

    fn three_color_row() -> Vec<ScanRow> {
        vec![row(
            0,
            &[(A, 0, 39), (B, 40, 64), (C, 65, 74), (A, 75, 134), (B, 135, 159)],
        )]
    }

    #[test]
    fn test_rank_colors_by_descending_coverage() {
        let freq = vec![(C, 10), (A, 100), (B, 50)];
        assert_eq!(rank_colors(&freq), vec![A, B, C]);
    }

    #[test]
    fn test_rank_ties_keep_encounter_order() {
        let freq = vec![(C, 5), (A, 5), (B, 9)];
        assert_eq!(rank_colors(&freq), vec![B, C, A]);
    }

    #[test]
    fn test_most_frequent_color_spans_full_row() {
        let rows = three_color_row();
        let freq = frequency_of(&rows);
        assert_eq!(freq, vec![(A, 100), (B, 50), (C, 10)]);

        let map = layer(&rows, &freq);
        assert_eq!(map.colors().collect::<Vec<_>>(), vec![A, B, C]);
        assert_eq!(map.get(A).unwrap(), &[Stroke::horizontal(0, 0, 159)]);
        assert_eq!(
            map.get(B).unwrap(),
            &[Stroke::horizontal(0, 40, 74), Stroke::horizontal(0, 135, 159)]
        );
        assert_eq!(map.get(C).unwrap(), &[Stroke::horizontal(0, 65, 74)]);
    }

    #[test]
    fn test_layered_result_paints_every_pixel_correctly() {
        let rows = three_color_row();
        let map = layer(&rows, &frequency_of(&rows));
        assert_eq!(paint(&map), expected(&rows));
    }

    #[test]
    fn test_unexposed_spans_are_not_emitted() {
        // B's only run is far from the C run; C-only spans must not produce B strokes.
        let rows = vec![
            row(0, &[(A, 0, 9), (C, 10, 12), (A, 13, 20)]),
            row(1, &[(B, 0, 5), (A, 6, 20)]),
        ];
        let map = layer(&rows, &frequency_of(&rows));
        assert_eq!(map.get(B).unwrap(), &[Stroke::horizontal(1, 0, 5)]);
        assert_eq!(paint(&map), expected(&rows));
    }

    #[test]
    fn test_gap_breaks_a_span() {
        // A dropped background run leaves a hole between x=9 and x=20.
        let rows = vec![row(0, &[(A, 0, 9), (A, 20, 29), (B, 30, 32)])];
        let map = layer(&rows, &frequency_of(&rows));
        assert_eq!(
            map.get(A).unwrap(),
            &[Stroke::horizontal(0, 0, 9), Stroke::horizontal(0, 20, 32)]
        );
        let painted = paint(&map);
        for x in 10..20 {
            assert!(!painted.contains_key(&(x, 0)), "hole at x={x} was painted");
        }
        assert_eq!(painted, expected(&rows));
    }

    #[test]
    fn test_spans_never_cross_rows() {
        let rows = vec![row(0, &[(A, 0, 9)]), row(1, &[(A, 0, 9)])];
        let map = layer(&rows, &frequency_of(&rows));
        assert_eq!(map.get(A).unwrap().len(), 2);
        assert!(map.strokes_in_order().all(|(_, s)| s.is_horizontal()));
    }

    #[test]
    fn test_layered_never_has_more_strokes_than_slotted() {
        let rows = vec![
            row(0, &[(A, 0, 3), (B, 4, 5), (A, 6, 9), (C, 10, 11), (A, 12, 15)]),
            row(1, &[(B, 0, 7), (C, 8, 9), (B, 10, 15)]),
            row(2, &[(C, 0, 1), (A, 2, 13), (C, 14, 15)]),
        ];
        let freq = frequency_of(&rows);
        let layered = layer(&rows, &freq);
        let slotted = slot(&rows);
        assert!(layered.total_strokes() <= slotted.total_strokes());
        assert_eq!(paint(&layered), expected(&rows));
        assert_eq!(paint(&slotted), expected(&rows));
    }

    #[test]
    fn test_slot_groups_in_discovery_order() {
        let rows = vec![
            row(0, &[(B, 0, 1), (A, 2, 9)]),
            row(1, &[(C, 0, 4), (B, 5, 9)]),
        ];
        let map = slot(&rows);
        assert_eq!(map.colors().collect::<Vec<_>>(), vec![B, A, C]);
        assert_eq!(
            map.get(B).unwrap(),
            &[Stroke::horizontal(0, 0, 1), Stroke::horizontal(1, 5, 9)]
        );
        assert_eq!(map.total_strokes(), 4);
    }

    #[test]
    fn test_empty_rows_give_empty_map() {
        let rows: Vec<ScanRow> = vec![Vec::new(), Vec::new()];
        assert!(layer(&rows, &[]).is_empty());
        assert!(slot(&rows).is_empty());
    }
}
