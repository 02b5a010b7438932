pub mod time;

const ID_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v',
    'w', 'x', 'y', 'z',
];

/// Run identifier: 21 lowercase alphanumerics.
pub fn longid() -> String {
    nanoid::nanoid!(21, &ID_ALPHABET)
}
