use bit_vec::BitVec;

use crate::models::grid::CELL_COUNT;

pub const SHIPS_PER_SIDE: usize = 10;

// One side's half of the game.
// ground:   cell -> still hidden from the opponent
// ships:    cell -> ship present
// revealed: cell -> ship has been shown to the opponent
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    pub ground: BitVec,
    pub ships: BitVec,
    pub revealed: BitVec,
}

impl Board {
    pub fn new() -> Self {
        Board {
            ground: BitVec::from_elem(CELL_COUNT, true),
            ships: BitVec::from_elem(CELL_COUNT, false),
            revealed: BitVec::from_elem(CELL_COUNT, false),
        }
    }

    // Rebuild a board from the packed bytes stored in the database
    pub fn from_bytes(ground: &[u8], ships: &[u8], revealed: &[u8]) -> Self {
        let unpack = |bytes: &[u8]| {
            let mut bits = BitVec::from_bytes(bytes);
            bits.truncate(CELL_COUNT);
            bits.grow(CELL_COUNT - bits.len(), false);
            bits
        };
        Board {
            ground: unpack(ground),
            ships: unpack(ships),
            revealed: unpack(revealed),
        }
    }

    pub fn ship_count(&self) -> usize {
        self.ships.iter().filter(|ship| *ship).count()
    }

    pub fn has_ship(&self, index: usize) -> bool {
        self.ships.get(index).unwrap_or(false)
    }

    pub fn is_hidden(&self, index: usize) -> bool {
        self.ground.get(index).unwrap_or(false)
    }

    pub fn place_ships(&mut self, cells: &[usize]) {
        self.ships = BitVec::from_elem(CELL_COUNT, false);
        for &cell in cells {
            self.ships.set(cell, true);
        }
    }

    pub fn relocate_ship(&mut self, from: usize, to: usize) {
        self.ships.set(from, false);
        self.revealed.set(from, false);
        self.ships.set(to, true);
    }

    // Expose a cell. Returns true when a ship was standing there.
    pub fn reveal(&mut self, index: usize) -> bool {
        self.ground.set(index, false);
        let hit = self.has_ship(index);
        if hit {
            self.revealed.set(index, true);
        }
        hit
    }

    // Destroy the ship at a cell. Returns false if there was none.
    pub fn sink(&mut self, index: usize) -> bool {
        if !self.has_ship(index) {
            return false;
        }
        self.ships.set(index, false);
        self.revealed.set(index, true);
        self.ground.set(index, false);
        true
    }

    pub fn hidden_cells(&self) -> Vec<usize> {
        set_cells(&self.ground)
    }

    pub fn ship_cells(&self) -> Vec<usize> {
        set_cells(&self.ships)
    }

    pub fn revealed_cells(&self) -> Vec<usize> {
        set_cells(&self.revealed)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

fn set_cells(bits: &BitVec) -> Vec<usize> {
    bits.iter()
        .enumerate()
        .filter_map(|(index, set)| set.then_some(index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_board_is_hidden_and_empty() {
        let board = Board::new();
        assert_eq!(board.hidden_cells().len(), CELL_COUNT);
        assert_eq!(board.ship_count(), 0);
        assert!(board.revealed_cells().is_empty());
    }

    #[test]
    fn bytes_survive_a_round_trip() {
        let mut board = Board::new();
        board.place_ships(&[0, 7, 8, 42, 99]);
        board.reveal(7);
        board.reveal(3);

        let restored = Board::from_bytes(
            &board.ground.to_bytes(),
            &board.ships.to_bytes(),
            &board.revealed.to_bytes(),
        );
        assert_eq!(restored, board);
    }

    #[test]
    fn relocation_clears_the_revealed_mark() {
        let mut board = Board::new();
        board.place_ships(&[5]);
        assert!(board.reveal(5));
        board.relocate_ship(5, 6);
        assert_eq!(board.ship_cells(), vec![6]);
        assert!(board.revealed_cells().is_empty());
    }

    #[test]
    fn sinking_an_empty_cell_changes_nothing() {
        let mut board = Board::new();
        board.place_ships(&[1]);
        let before = board.clone();
        assert!(!board.sink(2));
        assert_eq!(board, before);
        assert!(board.sink(1));
        assert_eq!(board.ship_count(), 0);
    }
}
