/// Implements arithmetic operators on a single-field tuple newtype by delegating each one to the wrapped value.
///
/// ```ignore
/// op!(Money: binary[Add::add, Sub::sub] assign[AddAssign::add_assign] unary[Neg::neg]);
/// ```
/// Every listed trait must be in scope at the call site.
#[macro_export]
macro_rules! op {
    ($t:ident: binary[$($bt:ident::$bf:ident),*] assign[$($at:ident::$af:ident),*] unary[$($ut:ident::$uf:ident),*]) => {
        $(
            impl $bt for $t {
                type Output = Self;

                fn $bf(self, rhs: Self) -> Self::Output {
                    Self(self.0.$bf(rhs.0))
                }
            }
        )*
        $(
            impl $at for $t {
                fn $af(&mut self, rhs: Self) {
                    self.0.$af(rhs.0)
                }
            }
        )*
        $(
            impl $ut for $t {
                type Output = Self;

                fn $uf(self) -> Self::Output {
                    Self(self.0.$uf())
                }
            }
        )*
    };
}
