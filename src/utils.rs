pub trait BitExtract {
    fn bit(self, bit: u8) -> bool;
}

impl BitExtract for u8 {
    fn bit(self, bit: u8) -> bool {
        self & (1 << bit) != 0
    }
}
