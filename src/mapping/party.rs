use crate::core::{Address, ConvertError, Email, Invoice, Name, Party};

/// Buyer reference used when the invoice carries no ordering code.
pub const NO_BUYER_REFERENCE: &str = "N/A";

/// Scheme of a VAT registration identifier.
pub const SCHEME_VAT: &str = "VA";

/// Scheme of an email electronic address.
pub const SCHEME_EMAIL: &str = "EM";

/// `ram:ApplicableHeaderTradeAgreement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agreement {
    pub buyer_reference: String,
    pub seller: Seller,
    pub buyer: Buyer,
}

impl Agreement {
    pub fn new(invoice: &Invoice) -> Result<Self, ConvertError> {
        let supplier = invoice
            .supplier
            .as_ref()
            .ok_or_else(|| ConvertError::missing("Supplier"))?;
        let customer = invoice
            .customer
            .as_ref()
            .ok_or_else(|| ConvertError::missing("Customer"))?;

        let buyer_reference = invoice
            .ordering
            .as_ref()
            .and_then(|o| o.code.as_deref())
            .unwrap_or(NO_BUYER_REFERENCE)
            .to_string();

        Ok(Self {
            buyer_reference,
            seller: Seller::new(supplier)?,
            buyer: Buyer::new(customer)?,
        })
    }
}

/// `ram:SellerTradeParty`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seller {
    pub name: String,
    pub contact: Option<Contact>,
    pub address: PostalTradeAddress,
    pub email: Option<UriCommunication>,
    pub tax_registration: TaxRegistration,
}

impl Seller {
    pub fn new(supplier: &Party) -> Result<Self, ConvertError> {
        let name = required_name("Supplier", supplier)?;
        let tax_id = supplier
            .tax_id
            .as_ref()
            .ok_or_else(|| ConvertError::missing("Supplier TaxID"))?;
        let address = PostalTradeAddress::first("Supplier", &supplier.addresses)?;

        Ok(Self {
            name,
            contact: Contact::new(supplier),
            address,
            email: UriCommunication::first_email(&supplier.emails),
            tax_registration: TaxRegistration {
                id: tax_id.to_string(),
                scheme_id: SCHEME_VAT,
            },
        })
    }
}

/// `ram:BuyerTradeParty`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buyer {
    /// The customer's tax identifier, when it has one.
    pub id: Option<String>,
    pub name: String,
    pub address: PostalTradeAddress,
    pub email: Option<UriCommunication>,
}

impl Buyer {
    pub fn new(customer: &Party) -> Result<Self, ConvertError> {
        Ok(Self {
            id: customer.tax_id.as_ref().map(|t| t.to_string()),
            name: required_name("Customer", customer)?,
            address: PostalTradeAddress::first("Customer", &customer.addresses)?,
            email: UriCommunication::first_email(&customer.emails),
        })
    }
}

fn required_name(role: &str, party: &Party) -> Result<String, ConvertError> {
    if party.name.trim().is_empty() {
        return Err(ConvertError::missing(format!("{role} Name")));
    }
    Ok(party.name.clone())
}

/// `ram:DefinedTradeContact`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub person_name: String,
    pub phone: String,
    pub email: String,
}

impl Contact {
    /// Contact of the party's first person, first phone and first email.
    ///
    /// `None` unless all three are present.
    pub fn new(party: &Party) -> Option<Self> {
        let person_name = contact_name(&party.people.first()?.name)?;
        let phone = party.telephones.first()?.num.trim();
        let email = party.emails.first()?.addr.trim();
        if phone.is_empty() || email.is_empty() {
            return None;
        }
        Some(Self {
            person_name,
            phone: phone.to_string(),
            email: email.to_string(),
        })
    }
}

/// `given surname`, or whichever of the two is non-blank.
pub fn contact_name(name: &Name) -> Option<String> {
    match (name.given.trim(), name.surname.trim()) {
        ("", "") => None,
        (given, "") => Some(given.to_string()),
        ("", surname) => Some(surname.to_string()),
        (given, surname) => Some(format!("{given} {surname}")),
    }
}

/// `ram:PostalTradeAddress`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostalTradeAddress {
    pub postcode: String,
    pub line_one: String,
    pub city: String,
    pub country_id: String,
}

impl PostalTradeAddress {
    /// The party's first address. `role` names the party in the error.
    pub fn first(role: &str, addresses: &[Address]) -> Result<Self, ConvertError> {
        let address = addresses
            .first()
            .ok_or_else(|| ConvertError::missing(format!("{role} Addresses")))?;
        Ok(Self {
            postcode: address.code.clone(),
            line_one: street_line(address),
            city: address.locality.clone(),
            country_id: address.country.clone(),
        })
    }
}

/// Street followed by the house number, e.g. `Dietmar-Hopp-Allee 16`.
fn street_line(address: &Address) -> String {
    let street = address.street.as_deref().unwrap_or("").trim();
    let num = address.num.as_deref().unwrap_or("").trim();
    match (street.is_empty(), num.is_empty()) {
        (false, false) => format!("{street} {num}"),
        (false, true) => street.to_string(),
        (true, _) => num.to_string(),
    }
}

/// `ram:URIUniversalCommunication/ram:URIID` with its scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriCommunication {
    pub uri_id: String,
    pub scheme_id: &'static str,
}

impl UriCommunication {
    pub fn first_email(emails: &[Email]) -> Option<Self> {
        emails
            .first()
            .map(|e| e.addr.trim())
            .filter(|addr| !addr.is_empty())
            .map(|addr| Self {
                uri_id: addr.to_string(),
                scheme_id: SCHEME_EMAIL,
            })
    }
}

/// `ram:SpecifiedTaxRegistration/ram:ID` with its scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxRegistration {
    pub id: String,
    pub scheme_id: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AddressBuilder, ErrorKind, Ordering, PartyBuilder};

    fn supplier() -> PartyBuilder {
        PartyBuilder::new("Provide One GmbH")
            .tax_id("DE", "111111125")
            .address(
                AddressBuilder::new("Walldorf", "69190", "DE")
                    .street("Dietmar-Hopp-Allee")
                    .num("16")
                    .build(),
            )
    }

    fn customer() -> PartyBuilder {
        PartyBuilder::new("Sample Consumer").address(
            AddressBuilder::new("München", "80939", "DE")
                .street("Werner-Heisenberg-Allee")
                .build(),
        )
    }

    #[test]
    fn seller_with_full_contact() {
        let party = supplier()
            .email("billing@example.com")
            .telephone("+49100200300")
            .person("John", "Doe")
            .build();
        let seller = Seller::new(&party).unwrap();

        assert_eq!(seller.name, "Provide One GmbH");
        assert_eq!(seller.tax_registration.id, "DE111111125");
        assert_eq!(seller.tax_registration.scheme_id, "VA");
        assert_eq!(seller.address.line_one, "Dietmar-Hopp-Allee 16");
        assert_eq!(seller.address.postcode, "69190");
        let contact = seller.contact.unwrap();
        assert_eq!(contact.person_name, "John Doe");
        assert_eq!(contact.phone, "+49100200300");
        assert_eq!(contact.email, "billing@example.com");
        assert_eq!(seller.email.unwrap().scheme_id, "EM");
    }

    #[test]
    fn contact_requires_all_three_parts() {
        let no_phone = supplier()
            .email("billing@example.com")
            .person("John", "Doe")
            .build();
        assert!(Seller::new(&no_phone).unwrap().contact.is_none());

        let no_person = supplier()
            .email("billing@example.com")
            .telephone("+49100200300")
            .build();
        assert!(Seller::new(&no_person).unwrap().contact.is_none());

        let no_email = supplier()
            .telephone("+49100200300")
            .person("John", "Doe")
            .build();
        let seller = Seller::new(&no_email).unwrap();
        assert!(seller.contact.is_none());
        assert!(seller.email.is_none());
    }

    #[test]
    fn address_line_joins_street_and_number() {
        let buyer = Buyer::new(&customer().build()).unwrap();
        assert_eq!(buyer.address.line_one, "Werner-Heisenberg-Allee");

        let only_number = AddressBuilder::new("Walldorf", "69190", "DE").num("16").build();
        let address = PostalTradeAddress::first("Supplier", &[only_number]).unwrap();
        assert_eq!(address.line_one, "16");
    }

    #[test]
    fn contact_name_degrades() {
        let name = |given: &str, surname: &str| Name {
            given: given.into(),
            surname: surname.into(),
        };
        assert_eq!(contact_name(&name("John", "Doe")).as_deref(), Some("John Doe"));
        assert_eq!(contact_name(&name("John", " ")).as_deref(), Some("John"));
        assert_eq!(contact_name(&name("", "Doe")).as_deref(), Some("Doe"));
        assert_eq!(contact_name(&name("", "")), None);
    }

    #[test]
    fn seller_requires_tax_id() {
        let party = PartyBuilder::new("No Tax GmbH")
            .address(AddressBuilder::new("Berlin", "10115", "DE").build())
            .build();
        let err = Seller::new(&party).unwrap_err();
        assert_eq!(err.to_string(), "Supplier TaxID not found");
    }

    #[test]
    fn seller_requires_address() {
        let party = PartyBuilder::new("Nowhere GmbH").tax_id("DE", "1").build();
        let err = Seller::new(&party).unwrap_err();
        assert_eq!(err.to_string(), "Supplier Addresses not found");
    }

    #[test]
    fn buyer_id_is_optional() {
        let buyer = Buyer::new(&customer().build()).unwrap();
        assert_eq!(buyer.id, None);
        assert_eq!(buyer.address.city, "München");

        let buyer = Buyer::new(&customer().tax_id("DE", "282741168").build()).unwrap();
        assert_eq!(buyer.id.as_deref(), Some("DE282741168"));
    }

    #[test]
    fn agreement_buyer_reference() {
        let mut invoice = Invoice {
            supplier: Some(supplier().build()),
            customer: Some(customer().build()),
            ..Default::default()
        };
        assert_eq!(Agreement::new(&invoice).unwrap().buyer_reference, "N/A");

        invoice.ordering = Some(Ordering {
            code: Some("04011000-12345-03".into()),
        });
        assert_eq!(
            Agreement::new(&invoice).unwrap().buyer_reference,
            "04011000-12345-03"
        );
    }

    #[test]
    fn agreement_requires_both_parties() {
        let invoice = Invoice {
            supplier: Some(supplier().build()),
            ..Default::default()
        };
        let err = Agreement::new(&invoice).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredField);
        assert_eq!(err.to_string(), "Customer not found");

        let err = Agreement::new(&Invoice::default()).unwrap_err();
        assert_eq!(err.to_string(), "Supplier not found");
    }
}
