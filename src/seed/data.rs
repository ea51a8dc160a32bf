use crate::error::ODataResult;
use crate::model::{
    ComplexTypeDef, Entity, EntityTypeDef, Facets, Link, NavigationBinding, NavigationDef,
    PrimitiveKind, Property, PropertyDef, PropertyValue, Schema,
};
use crate::store::EntityStore;
use anyhow::Result;

pub const NAMESPACE: &str = "OData.Demo";
pub const PRODUCT_SUPPLIERS: &str = "ProductSuppliers";

/// Products, Categories and Suppliers of the demo catalog.
pub fn sample_schema() -> Result<Schema> {
    let key = || Facets::default().not_null();

    Schema::builder(NAMESPACE)
        .complex_type(ComplexTypeDef::new(
            "Address",
            vec![
                PropertyDef::primitive("City", PrimitiveKind::String),
                PropertyDef::primitive("Country", PrimitiveKind::String),
            ],
        ))
        .entity_type(
            EntityTypeDef::new("Product", &["ID"])
                .property(PropertyDef::primitive("ID", PrimitiveKind::Int32).with_facets(key()))
                .property(PropertyDef::primitive("Name", PrimitiveKind::String))
                .property(PropertyDef::primitive("Description", PrimitiveKind::String))
                .property(PropertyDef::primitive("CategoryID", PrimitiveKind::Int32))
                .navigation(
                    NavigationDef::to_one(
                        "Category",
                        "Category",
                        NavigationBinding::ForeignKey {
                            property: "CategoryID".to_string(),
                        },
                    )
                    .required()
                    .partner("Products"),
                )
                .navigation(
                    NavigationDef::to_many(
                        "Suppliers",
                        "Supplier",
                        NavigationBinding::LinkTable {
                            table: PRODUCT_SUPPLIERS.to_string(),
                            reversed: false,
                        },
                    )
                    .partner("Products"),
                ),
        )
        .entity_type(
            EntityTypeDef::new("Category", &["ID"])
                .property(PropertyDef::primitive("ID", PrimitiveKind::Int32).with_facets(key()))
                .property(PropertyDef::primitive("Name", PrimitiveKind::String))
                .navigation(
                    NavigationDef::to_many(
                        "Products",
                        "Product",
                        NavigationBinding::InverseForeignKey {
                            property: "CategoryID".to_string(),
                        },
                    )
                    .partner("Category"),
                ),
        )
        .entity_type(
            EntityTypeDef::new("Supplier", &["SupplierID"])
                .property(
                    PropertyDef::primitive("SupplierID", PrimitiveKind::Int32).with_facets(key()),
                )
                .property(PropertyDef::primitive("CompanyName", PrimitiveKind::String))
                .property(PropertyDef::primitive("Fax", PrimitiveKind::String))
                .property(PropertyDef::complex("Address", "Address"))
                .navigation(
                    NavigationDef::to_many(
                        "Products",
                        "Product",
                        NavigationBinding::LinkTable {
                            table: PRODUCT_SUPPLIERS.to_string(),
                            reversed: true,
                        },
                    )
                    .partner("Suppliers"),
                ),
        )
        .entity_set("Products", "Product")
        .entity_set("Categories", "Category")
        .entity_set("Suppliers", "Supplier")
        .build()
}

/// Seeds a store built from [`sample_schema`]. Keys are assigned by the
/// store in insertion order, starting at 1.
pub fn load_sample_data<S: EntityStore + ?Sized>(store: &S) -> ODataResult<()> {
    load_categories(store)?;
    load_products(store)?;
    load_suppliers(store)?;

    let links = [(1, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 6), (6, 7)];
    for (product, supplier) in links {
        store.add_link(PRODUCT_SUPPLIERS, Link::new(product, supplier))?;
    }
    Ok(())
}

fn load_categories<S: EntityStore + ?Sized>(store: &S) -> ODataResult<()> {
    let Some(category) = store.schema().tag_of("Category") else {
        return Ok(());
    };
    for name in ["Notebooks", "Organizers", "Monitors"] {
        store.insert(category, Entity::new(category).with_property("Name", name))?;
    }
    Ok(())
}

fn load_products<S: EntityStore + ?Sized>(store: &S) -> ODataResult<()> {
    let Some(product) = store.schema().tag_of("Product") else {
        return Ok(());
    };
    let rows = [
        (
            "Notebook Basic 15",
            "Notebook Basic, 1.7GHz - 15 XGA - 1024MB DDR2 SDRAM - 40GB",
            1,
        ),
        (
            "Notebook Professional 17",
            "Notebook Professional, 2.8GHz - 15 XGA - 8GB DDR3 RAM - 500GB",
            1,
        ),
        (
            "1UMTS PDA",
            "Ultrafast 3G UMTS/HSDPA Pocket PC, supports GSM network",
            2,
        ),
        (
            "Comfort Easy",
            "32 GB Digital Assitant with high-resolution color screen",
            2,
        ),
        (
            "Ergo Screen",
            "19 Optimum Resolution 1024 x 768 @ 85Hz, resolution 1280 x 960",
            3,
        ),
        (
            "Flat Basic",
            "Optimum Hi-Resolution max. 1600 x 1200 @ 85Hz, Dot Pitch: 0.24mm",
            3,
        ),
    ];
    for (name, description, category_id) in rows {
        let entity = Entity::new(product)
            .with_property("Name", name)
            .with_property("Description", description)
            .with_property("CategoryID", category_id);
        store.insert(product, entity)?;
    }
    Ok(())
}

fn load_suppliers<S: EntityStore + ?Sized>(store: &S) -> ODataResult<()> {
    let Some(supplier) = store.schema().tag_of("Supplier") else {
        return Ok(());
    };
    let rows = [
        ("DESIGN INDEX INDIA", None, "Delhi", "India"),
        ("Advance Label Ltd", Some("(617) 555-3389"), "Tsuen Wan", "Hong Kong"),
        ("TECH GROUP INTERNATIONAL LIMITED ", None, "Bangalore", "India"),
        ("BenQ India Pvt Ltd", Some("43844115"), "Gurgaon", "India"),
        ("Sharp", Some("(12345) 1210"), "Osaka", "Japan"),
        ("Wonder World", Some("43844115"), "Zürich", "Switzerland"),
        ("Touch International", Some("43847115"), "Austin", "USA"),
    ];
    for (company, fax, city, country) in rows {
        let address = vec![Property::new("City", city), Property::new("Country", country)];
        let entity = Entity::new(supplier)
            .with_property("CompanyName", company)
            .with_property("Fax", fax.map_or(PropertyValue::Null, PropertyValue::from))
            .with_property("Address", address);
        store.insert(supplier, entity)?;
    }
    Ok(())
}
