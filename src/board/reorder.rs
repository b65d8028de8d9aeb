//! Ordered-sibling repositioning for columns and tasks.
//!
//! Columns order themselves inside a board, tasks inside a column. Both
//! families keep a 1-based, dense, unique `position` per parent: after any
//! committed write a parent with N children holds positions exactly 1..=N.
//! One algorithm serves both families, parameterized by a [`SiblingSet`]
//! describing the table and its parent column. All writes are bulk range
//! shifts, so a move costs at most two UPDATEs plus the moved row itself.
//!
//! Callers run every function here inside one transaction; nothing in this
//! module commits.

use rusqlite::{Connection, params};

/// Table descriptor for one positioned-item family.
///
/// `table` and `parent_col` are compile-time constants, so interpolating
/// them into SQL is not an injection surface.
pub(crate) struct SiblingSet {
    pub table: &'static str,
    pub parent_col: &'static str,
}

/// Columns ordered within a board.
pub(crate) const BOARD_COLUMNS: SiblingSet = SiblingSet {
    table: "columns",
    parent_col: "board_id",
};

/// Tasks ordered within a column.
pub(crate) const COLUMN_TASKS: SiblingSet = SiblingSet {
    table: "tasks",
    parent_col: "column_id",
};

impl SiblingSet {
    /// Number of items currently under `parent_id`.
    pub fn sibling_count(&self, conn: &Connection, parent_id: i64) -> rusqlite::Result<i64> {
        conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?1",
                self.table, self.parent_col
            ),
            params![parent_id],
            |row| row.get(0),
        )
    }

    /// Append-to-end position for a new item under `parent_id`.
    pub fn next_position(&self, conn: &Connection, parent_id: i64) -> rusqlite::Result<i64> {
        conn.query_row(
            &format!(
                "SELECT COALESCE(MAX(position), 0) + 1 FROM {} WHERE {} = ?1",
                self.table, self.parent_col
            ),
            params![parent_id],
            |row| row.get(0),
        )
    }

    /// Shift `position` by `delta` for every sibling of `parent_id` whose
    /// position lies in `[lo, hi]`, optionally excluding one row.
    fn shift(
        &self,
        conn: &Connection,
        parent_id: i64,
        exclude_id: Option<i64>,
        lo: i64,
        hi: i64,
        delta: i64,
    ) -> rusqlite::Result<usize> {
        match exclude_id {
            Some(id) => conn.execute(
                &format!(
                    "UPDATE {} SET position = position + ?1
                     WHERE {} = ?2 AND position >= ?3 AND position <= ?4 AND id != ?5",
                    self.table, self.parent_col
                ),
                params![delta, parent_id, lo, hi, id],
            ),
            None => conn.execute(
                &format!(
                    "UPDATE {} SET position = position + ?1
                     WHERE {} = ?2 AND position >= ?3 AND position <= ?4",
                    self.table, self.parent_col
                ),
                params![delta, parent_id, lo, hi],
            ),
        }
    }

    /// Renumber the survivors after the item at `removed_position` left
    /// `parent_id` (by deletion or by moving to another parent).
    pub fn close_gap(
        &self,
        conn: &Connection,
        parent_id: i64,
        removed_position: i64,
    ) -> rusqlite::Result<usize> {
        self.shift(conn, parent_id, None, removed_position + 1, i64::MAX, -1)
    }
}

/// Move one item to `requested_position` under `dest_parent`, shifting the
/// affected siblings so both containers stay dense.
///
/// The requested position is clamped to `[1, N]` for a same-container move
/// and `[1, N_dest + 1]` for a cross-container move; out-of-range input can
/// never introduce a gap. Returns the position actually assigned. A
/// same-container move to the item's current position writes nothing.
///
/// Must be called with `old_position` equal to the item's current committed
/// position and inside an open transaction.
pub(crate) fn reposition(
    conn: &Connection,
    set: &SiblingSet,
    item_id: i64,
    source_parent: i64,
    dest_parent: i64,
    old_position: i64,
    requested_position: i64,
) -> rusqlite::Result<i64> {
    if source_parent == dest_parent {
        let count = set.sibling_count(conn, source_parent)?;
        let new_position = requested_position.clamp(1, count.max(1));
        if new_position == old_position {
            return Ok(old_position);
        }
        if new_position > old_position {
            // Forward move: siblings in (old, new] slide down into the gap.
            set.shift(conn, source_parent, Some(item_id), old_position + 1, new_position, -1)?;
        } else {
            // Backward move: siblings in [new, old) slide up to make room.
            set.shift(conn, source_parent, Some(item_id), new_position, old_position - 1, 1)?;
        }
        conn.execute(
            &format!("UPDATE {} SET position = ?1 WHERE id = ?2", set.table),
            params![new_position, item_id],
        )?;
        Ok(new_position)
    } else {
        let dest_count = set.sibling_count(conn, dest_parent)?;
        let new_position = requested_position.clamp(1, dest_count + 1);
        // The moved row still sits at old_position in the source, outside
        // the shifted range.
        set.close_gap(conn, source_parent, old_position)?;
        set.shift(conn, dest_parent, None, new_position, i64::MAX, 1)?;
        conn.execute(
            &format!(
                "UPDATE {} SET {} = ?1, position = ?2 WHERE id = ?3",
                set.table, set.parent_col
            ),
            params![dest_parent, new_position, item_id],
        )?;
        Ok(new_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::db::migrate;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO users (id, email, password_digest, first_name, last_name)
             VALUES (1, 'a@example.com', 'x', 'A', 'B');
             INSERT INTO boards (id, user_id, name) VALUES (1, 1, 'Board');",
        )
        .unwrap();
        conn
    }

    /// Seed one column per name at positions 1..=N and return their ids.
    fn seed_columns(conn: &Connection, board_id: i64, names: &[&str]) -> Vec<i64> {
        let mut ids = Vec::new();
        for (i, name) in names.iter().enumerate() {
            conn.execute(
                "INSERT INTO columns (board_id, name, position) VALUES (?1, ?2, ?3)",
                params![board_id, name, i as i64 + 1],
            )
            .unwrap();
            ids.push(conn.last_insert_rowid());
        }
        ids
    }

    fn seed_tasks(conn: &Connection, column_id: i64, titles: &[&str]) -> Vec<i64> {
        let mut ids = Vec::new();
        for (i, title) in titles.iter().enumerate() {
            conn.execute(
                "INSERT INTO tasks (column_id, title, position) VALUES (?1, ?2, ?3)",
                params![column_id, title, i as i64 + 1],
            )
            .unwrap();
            ids.push(conn.last_insert_rowid());
        }
        ids
    }

    /// (id, position) pairs under a parent, ordered by position.
    fn positions_of(conn: &Connection, set: &SiblingSet, parent_id: i64) -> Vec<(i64, i64)> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, position FROM {} WHERE {} = ?1 ORDER BY position",
                set.table, set.parent_col
            ))
            .unwrap();
        let rows = stmt
            .query_map(params![parent_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap();
        rows.map(|r| r.unwrap()).collect()
    }

    /// Positions under a parent must be exactly {1..N}.
    fn assert_dense(conn: &Connection, set: &SiblingSet, parent_id: i64) {
        let positions: Vec<i64> = positions_of(conn, set, parent_id)
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        let expected: Vec<i64> = (1..=positions.len() as i64).collect();
        assert_eq!(positions, expected, "positions not dense under parent {parent_id}");
    }

    #[test]
    fn forward_move_shifts_intervening_siblings_down() {
        let conn = test_conn();
        // [A:1, B:2, C:3, D:4] — move D to position 2.
        let ids = seed_columns(&conn, 1, &["A", "B", "C", "D"]);
        let assigned = reposition(&conn, &BOARD_COLUMNS, ids[3], 1, 1, 4, 2).unwrap();
        assert_eq!(assigned, 2);
        assert_eq!(
            positions_of(&conn, &BOARD_COLUMNS, 1),
            vec![(ids[0], 1), (ids[3], 2), (ids[1], 3), (ids[2], 4)]
        );
        assert_dense(&conn, &BOARD_COLUMNS, 1);
    }

    #[test]
    fn backward_move_shifts_intervening_siblings_up() {
        let conn = test_conn();
        // [A:1, B:2, C:3, D:4] — move A to position 3.
        let ids = seed_columns(&conn, 1, &["A", "B", "C", "D"]);
        let assigned = reposition(&conn, &BOARD_COLUMNS, ids[0], 1, 1, 1, 3).unwrap();
        assert_eq!(assigned, 3);
        assert_eq!(
            positions_of(&conn, &BOARD_COLUMNS, 1),
            vec![(ids[1], 1), (ids[2], 2), (ids[0], 3), (ids[3], 4)]
        );
        assert_dense(&conn, &BOARD_COLUMNS, 1);
    }

    #[test]
    fn same_position_move_is_a_no_op() {
        let conn = test_conn();
        let ids = seed_columns(&conn, 1, &["A", "B", "C"]);
        let before = positions_of(&conn, &BOARD_COLUMNS, 1);
        let assigned = reposition(&conn, &BOARD_COLUMNS, ids[1], 1, 1, 2, 2).unwrap();
        assert_eq!(assigned, 2);
        assert_eq!(positions_of(&conn, &BOARD_COLUMNS, 1), before);
    }

    #[test]
    fn round_trip_restores_every_sibling() {
        let conn = test_conn();
        let ids = seed_columns(&conn, 1, &["A", "B", "C", "D", "E"]);
        let before = positions_of(&conn, &BOARD_COLUMNS, 1);
        reposition(&conn, &BOARD_COLUMNS, ids[1], 1, 1, 2, 5).unwrap();
        reposition(&conn, &BOARD_COLUMNS, ids[1], 1, 1, 5, 2).unwrap();
        assert_eq!(positions_of(&conn, &BOARD_COLUMNS, 1), before);
    }

    #[test]
    fn cross_container_move_renumbers_both_columns() {
        let conn = test_conn();
        let cols = seed_columns(&conn, 1, &["Src", "Dst"]);
        // Source [A:1, B:2, C:3], destination [X:1, Y:2] — move B to dst at 2.
        let src_tasks = seed_tasks(&conn, cols[0], &["A", "B", "C"]);
        let dst_tasks = seed_tasks(&conn, cols[1], &["X", "Y"]);
        let assigned =
            reposition(&conn, &COLUMN_TASKS, src_tasks[1], cols[0], cols[1], 2, 2).unwrap();
        assert_eq!(assigned, 2);
        assert_eq!(
            positions_of(&conn, &COLUMN_TASKS, cols[0]),
            vec![(src_tasks[0], 1), (src_tasks[2], 2)]
        );
        assert_eq!(
            positions_of(&conn, &COLUMN_TASKS, cols[1]),
            vec![(dst_tasks[0], 1), (src_tasks[1], 2), (dst_tasks[1], 3)]
        );
        assert_dense(&conn, &COLUMN_TASKS, cols[0]);
        assert_dense(&conn, &COLUMN_TASKS, cols[1]);
    }

    #[test]
    fn cross_container_move_to_empty_column() {
        let conn = test_conn();
        let cols = seed_columns(&conn, 1, &["Src", "Dst"]);
        let src_tasks = seed_tasks(&conn, cols[0], &["A", "B"]);
        let assigned =
            reposition(&conn, &COLUMN_TASKS, src_tasks[0], cols[0], cols[1], 1, 1).unwrap();
        assert_eq!(assigned, 1);
        assert_eq!(
            positions_of(&conn, &COLUMN_TASKS, cols[0]),
            vec![(src_tasks[1], 1)]
        );
        assert_eq!(
            positions_of(&conn, &COLUMN_TASKS, cols[1]),
            vec![(src_tasks[0], 1)]
        );
    }

    #[test]
    fn out_of_range_positions_are_clamped() {
        let conn = test_conn();
        let ids = seed_columns(&conn, 1, &["A", "B", "C"]);

        // Far beyond the end clamps to N.
        let assigned = reposition(&conn, &BOARD_COLUMNS, ids[0], 1, 1, 1, 99).unwrap();
        assert_eq!(assigned, 3);
        assert_dense(&conn, &BOARD_COLUMNS, 1);

        // Zero and negative clamp to 1.
        let assigned = reposition(&conn, &BOARD_COLUMNS, ids[0], 1, 1, 3, 0).unwrap();
        assert_eq!(assigned, 1);
        let assigned = reposition(&conn, &BOARD_COLUMNS, ids[1], 1, 1, 2, -7).unwrap();
        assert_eq!(assigned, 1);
        assert_dense(&conn, &BOARD_COLUMNS, 1);
    }

    #[test]
    fn cross_container_clamp_allows_append_slot() {
        let conn = test_conn();
        let cols = seed_columns(&conn, 1, &["Src", "Dst"]);
        let src_tasks = seed_tasks(&conn, cols[0], &["A"]);
        seed_tasks(&conn, cols[1], &["X", "Y"]);
        // Destination has 2 tasks; position 50 clamps to 3 (append).
        let assigned =
            reposition(&conn, &COLUMN_TASKS, src_tasks[0], cols[0], cols[1], 1, 50).unwrap();
        assert_eq!(assigned, 3);
        assert_dense(&conn, &COLUMN_TASKS, cols[1]);
    }

    #[test]
    fn close_gap_renumbers_after_removal() {
        let conn = test_conn();
        let ids = seed_columns(&conn, 1, &["A", "B", "C", "D"]);
        conn.execute("DELETE FROM columns WHERE id = ?1", params![ids[1]])
            .unwrap();
        BOARD_COLUMNS.close_gap(&conn, 1, 2).unwrap();
        assert_eq!(
            positions_of(&conn, &BOARD_COLUMNS, 1),
            vec![(ids[0], 1), (ids[2], 2), (ids[3], 3)]
        );
    }

    #[test]
    fn next_position_appends_to_end() {
        let conn = test_conn();
        assert_eq!(BOARD_COLUMNS.next_position(&conn, 1).unwrap(), 1);
        seed_columns(&conn, 1, &["A", "B"]);
        assert_eq!(BOARD_COLUMNS.next_position(&conn, 1).unwrap(), 3);
    }

    #[test]
    fn failed_final_write_rolls_back_sibling_shifts() {
        let conn = test_conn();
        let ids = seed_columns(&conn, 1, &["A", "B", "C", "D"]);
        let before = positions_of(&conn, &BOARD_COLUMNS, 1);

        {
            let tx = conn.unchecked_transaction().unwrap();
            // Apply the shifts of a forward move of A to position 3...
            BOARD_COLUMNS
                .shift(&tx, 1, Some(ids[0]), 2, 3, -1)
                .unwrap();
            // ...then force the moved-item write to violate CHECK(position > 0).
            let err = tx.execute(
                "UPDATE columns SET position = 0 WHERE id = ?1",
                params![ids[0]],
            );
            assert!(err.is_err());
            // Dropping the transaction rolls everything back.
        }

        assert_eq!(positions_of(&conn, &BOARD_COLUMNS, 1), before);
        assert_dense(&conn, &BOARD_COLUMNS, 1);
    }
}
