mod bill_reference;

pub use bill_reference::{generate_bill_reference, validate_bill_reference, BillReferenceError, MAX_BILL_REFERENCE_LEN};
