use crate::errors::CustomError;

// The board is a fixed square addressed by a single cell index
pub const BOARD_SIZE: usize = 10;
pub const CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

/// Rejects indices outside the board.
pub fn validate_index(index: i64) -> Result<usize, CustomError> {
    if index < 0 || index >= CELL_COUNT as i64 {
        return Err(CustomError::InvalidShipIndexValue(format!(
            "cell index must be between 0 and {}",
            CELL_COUNT - 1
        )));
    }
    Ok(index as usize)
}

/// The 2x2 block anchored at `index`.
///
/// The block grows right and down. On the last column it grows left instead,
/// on the last row it grows up, and the final cell folds both ways.
/// `index` must already be valid.
pub fn neighbors(index: usize) -> [usize; 4] {
    let last_column = index % BOARD_SIZE == BOARD_SIZE - 1;
    let last_row = index / BOARD_SIZE == BOARD_SIZE - 1;

    let horizontal = if last_column { index - 1 } else { index + 1 };
    let (vertical, diagonal) = if last_row {
        (index - BOARD_SIZE, horizontal - BOARD_SIZE)
    } else {
        (index + BOARD_SIZE, horizontal + BOARD_SIZE)
    };

    [index, horizontal, vertical, diagonal]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sorted(mut cells: [usize; 4]) -> [usize; 4] {
        cells.sort_unstable();
        cells
    }

    #[test]
    fn every_cell_has_four_distinct_neighbors_on_the_board() {
        for index in 0..CELL_COUNT {
            let cells = neighbors(index);
            let unique: HashSet<_> = cells.iter().collect();
            assert_eq!(unique.len(), 4, "cell {index} produced {cells:?}");
            assert!(cells.iter().all(|&c| c < CELL_COUNT), "cell {index} left the board");
            assert_eq!(cells[0], index);
        }
    }

    #[test]
    fn block_is_always_two_by_two() {
        for index in 0..CELL_COUNT {
            let cells = neighbors(index);
            let rows: HashSet<_> = cells.iter().map(|c| c / BOARD_SIZE).collect();
            let columns: HashSet<_> = cells.iter().map(|c| c % BOARD_SIZE).collect();
            assert_eq!(rows.len(), 2, "cell {index}");
            assert_eq!(columns.len(), 2, "cell {index}");
        }
    }

    #[test]
    fn interior_grows_right_and_down() {
        assert_eq!(neighbors(44), [44, 45, 54, 55]);
    }

    #[test]
    fn corners() {
        assert_eq!(sorted(neighbors(0)), [0, 1, 10, 11]);
        assert_eq!(sorted(neighbors(9)), [8, 9, 18, 19]);
        assert_eq!(sorted(neighbors(90)), [80, 81, 90, 91]);
        assert_eq!(sorted(neighbors(99)), [88, 89, 98, 99]);
    }

    #[test]
    fn last_column_grows_left() {
        for row in 0..BOARD_SIZE - 1 {
            let index = row * BOARD_SIZE + BOARD_SIZE - 1;
            assert_eq!(
                sorted(neighbors(index)),
                [index - 1, index, index + BOARD_SIZE - 1, index + BOARD_SIZE]
            );
        }
    }

    #[test]
    fn last_row_grows_up() {
        for index in 90..99 {
            assert_eq!(
                sorted(neighbors(index)),
                [index - BOARD_SIZE, index - BOARD_SIZE + 1, index, index + 1]
            );
        }
    }

    #[test]
    fn index_validation() {
        assert_eq!(validate_index(0), Ok(0));
        assert_eq!(validate_index(99), Ok(99));
        assert!(validate_index(100).is_err());
        assert!(validate_index(-1).is_err());
    }
}
